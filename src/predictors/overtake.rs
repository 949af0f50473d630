//! A faster vehicle pulling alongside from close behind.

use super::{pair_cpa, PairContext};
use crate::geometry::{heading_diff, local_enu};
use crate::threat::{Detection, ThreatKind, ThreatMetrics};

/// Near-parallel courses only.
const MAX_HEADING_DIFF_DEG: f64 = 20.0;
/// The maneuver is only interesting once the pair is nearly door-to-door.
const MAX_DISTANCE_M: f64 = 12.0;
/// Required speed advantage of the overtaker.
const MIN_SPEED_ADVANTAGE_MS: f64 = 1.5;
/// CPA confirmation gates.
const MIN_CLOSING_SPEED_MS: f64 = 0.3;
const MAX_TTC_S: f64 = 2.0;

pub fn check(ctx: &PairContext) -> Option<Detection> {
    let a = ctx.self_sample;
    let b = ctx.other_sample;

    if heading_diff(a.heading, b.heading) > MAX_HEADING_DIFF_DEG
        || ctx.distance_m > MAX_DISTANCE_M
        || b.speed <= a.speed + MIN_SPEED_ADVANTAGE_MS
    {
        return None;
    }

    // Offset of the relative position orthogonal to self's direction of
    // travel; the cross product of the two unit-scaled vectors gives it.
    let (east, north) = local_enu(a.latitude, a.longitude, b.latitude, b.longitude);
    let h = a.heading.to_radians();
    let (he, hn) = (h.sin(), h.cos());
    let lateral_m = (east * hn - north * he).abs();
    if lateral_m > ctx.cfg.overtake_side_max_m {
        return None;
    }

    let cpa = pair_cpa(a, b, MAX_TTC_S);
    if cpa.closing_speed_ms > MIN_CLOSING_SPEED_MS && cpa.t_star <= MAX_TTC_S {
        return Some(Detection {
            kind: ThreatKind::Overtake,
            metrics: ThreatMetrics {
                lateral_m: Some(lateral_m),
                time_to_cpa_s: Some(cpa.t_star),
                ..Default::default()
            },
        });
    }
    None
}
