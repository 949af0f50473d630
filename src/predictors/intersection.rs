//! Crossing traffic converging on a shared conflict point.

use super::{pair_cpa, PairContext};
use crate::geometry::heading_diff;
use crate::threat::{Detection, ThreatKind, ThreatMetrics};

/// Both vehicles must be doing at least ~10 km/h.
const MIN_SPEED_MS: f64 = 2.78;
/// Heading separation band that reads as a T or L crossing.
const CROSSING_BAND_DEG: (f64, f64) = (60.0, 120.0);
/// Predicted miss distance that still counts as a conflict.
const CPA_GATE_M: f64 = 8.0;

pub fn check(ctx: &PairContext) -> Option<Detection> {
    let a = ctx.self_sample;
    let b = ctx.other_sample;
    if a.speed < MIN_SPEED_MS || b.speed < MIN_SPEED_MS {
        return None;
    }
    let diff = heading_diff(a.heading, b.heading);
    if diff < CROSSING_BAND_DEG.0 || diff > CROSSING_BAND_DEG.1 {
        return None;
    }

    let cpa = pair_cpa(a, b, ctx.cfg.projection_time_s);
    if cpa.cpa_dist_m <= CPA_GATE_M && cpa.t_star <= ctx.cfg.ttc_max_s {
        return Some(Detection {
            kind: ThreatKind::IntersectionCollision,
            metrics: ThreatMetrics {
                time_to_cpa_s: Some(cpa.t_star),
                distance_m: Some(cpa.cpa_dist_m),
                ..Default::default()
            },
        });
    }
    None
}
