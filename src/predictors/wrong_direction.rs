//! A nearby vehicle moving against the neighborhood's dominant direction.

use super::PairContext;
use crate::geometry::heading_diff;
use crate::threat::{Detection, ThreatKind, ThreatMetrics};

/// Counter-flow only matters at close range.
const MAX_DISTANCE_M: f64 = 40.0;

pub fn check(ctx: &PairContext) -> Option<Detection> {
    let majority = ctx.majority_heading?;
    let diff = heading_diff(ctx.other_sample.heading, majority);
    if diff >= ctx.cfg.wrong_dir_diff_deg && ctx.distance_m <= MAX_DISTANCE_M {
        return Some(Detection {
            kind: ThreatKind::WrongDirection,
            metrics: ThreatMetrics {
                distance_m: Some(ctx.distance_m),
                ..Default::default()
            },
        });
    }
    None
}
