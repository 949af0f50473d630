//! Sudden braking directly ahead of a faster follower.

use super::PairContext;
use crate::threat::{Detection, ThreatKind, ThreatMetrics};

/// Follower must actually be gaining on the leader for the pair to matter.
const MIN_CLOSING_SPEED_MS: f64 = 0.5;

/// Fires when the counterpart's speed window shows a hard deceleration,
/// the pair is within the rear-end distance, and self is closing on it.
///
/// Deceleration comes from the counterpart's last two observed speeds;
/// sub-second gaps are widened to one second so bursts of updates cannot
/// inflate the estimate.
pub fn check(ctx: &PairContext) -> Option<Detection> {
    let h = ctx.other_history;
    if h.len() < 2 {
        return None;
    }
    let prev = h[h.len() - 2];
    let last = h[h.len() - 1];

    let dt_s = ((last.server_ms - prev.server_ms) as f64 / 1000.0).max(1.0);
    let decel = (prev.speed - last.speed) / dt_s;
    let closing = ctx.self_sample.speed - ctx.other_sample.speed;

    if decel >= ctx.cfg.sudden_decel_ms2
        && ctx.distance_m <= ctx.cfg.rear_end_distance_m
        && closing > MIN_CLOSING_SPEED_MS
    {
        return Some(Detection {
            kind: ThreatKind::RearEnd,
            metrics: ThreatMetrics {
                distance_m: Some(ctx.distance_m),
                deceleration: Some(decel),
                ..Default::default()
            },
        });
    }
    None
}
