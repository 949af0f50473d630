//! The predictor bank: five kinematic hazard detectors.
//!
//! Detectors run in a fixed order for every (self, other) pair and the
//! first match wins, so a single message emits at most one threat per
//! neighbor. Each detector is a pure function of the two samples plus the
//! derived context handed in by the ingress pipeline.

mod intersection;
mod overtake;
mod predicted_collision;
mod rear_end;
mod wrong_direction;

use crate::config::EngineConfig;
use crate::geometry::{compute_cpa_ttc, local_enu, CpaTtc};
use crate::history::SpeedSample;
use crate::telemetry::VehicleSample;
use crate::threat::Detection;

/// Everything a detector may look at for one vehicle pair.
pub struct PairContext<'a> {
    pub cfg: &'a EngineConfig,
    /// The vehicle whose message is being processed.
    pub self_sample: &'a VehicleSample,
    /// The neighbor under consideration.
    pub other_sample: &'a VehicleSample,
    /// Current great-circle separation, meters.
    pub distance_m: f64,
    /// The neighbor's recent speed window, oldest first.
    pub other_history: &'a [SpeedSample],
    /// Dominant travel direction of the neighborhood, if defined.
    pub majority_heading: Option<f64>,
}

/// Run the bank in order; the first detector to fire decides the pair.
pub fn evaluate(ctx: &PairContext) -> Option<Detection> {
    // Two parked vehicles cannot interact.
    if ctx.self_sample.speed < ctx.cfg.min_moving_speed_ms
        && ctx.other_sample.speed < ctx.cfg.min_moving_speed_ms
    {
        return None;
    }

    predicted_collision::check(ctx)
        .or_else(|| rear_end::check(ctx))
        .or_else(|| wrong_direction::check(ctx))
        .or_else(|| intersection::check(ctx))
        .or_else(|| overtake::check(ctx))
}

/// Linearized CPA for a pair, in the tangent frame anchored at self.
pub(crate) fn pair_cpa(
    self_sample: &VehicleSample,
    other_sample: &VehicleSample,
    max_t: f64,
) -> CpaTtc {
    let other_pos = local_enu(
        self_sample.latitude,
        self_sample.longitude,
        other_sample.latitude,
        other_sample.longitude,
    );
    compute_cpa_ttc(
        (0.0, 0.0),
        self_sample.velocity_en(),
        other_pos,
        other_sample.velocity_en(),
        max_t,
    )
}
