//! Constant-velocity path simulation over a short horizon.

use super::PairContext;
use crate::geometry::{haversine_m, project_geodesic};
use crate::threat::{Detection, ThreatKind, ThreatMetrics};

/// Project both vehicles along their current headings at whole-second
/// steps and fire on the first step where the paths come within the
/// collision radius. The radius widens while the reporting vehicle is in
/// a sharp turn, where the straight-line assumption is weakest.
pub fn check(ctx: &PairContext) -> Option<Detection> {
    let cfg = ctx.cfg;
    let step = cfg.predict_step_s.max(1);

    let mut radius_m = cfg.collision_radius_m;
    if ctx.self_sample.is_sudden_turn(cfg.angular_vel_high_deg_s) {
        radius_m += cfg.uncertainty_inflation_m;
    }

    let a = ctx.self_sample;
    let b = ctx.other_sample;

    let mut t = step;
    while t <= cfg.lookahead_s {
        let dist = t as f64;
        let (a_lat, a_lon) = project_geodesic(a.latitude, a.longitude, a.heading, a.speed * dist);
        let (b_lat, b_lon) = project_geodesic(b.latitude, b.longitude, b.heading, b.speed * dist);
        let d = haversine_m(a_lat, a_lon, b_lat, b_lon);
        if d <= radius_m {
            return Some(Detection {
                kind: ThreatKind::PredictedCollision,
                metrics: ThreatMetrics {
                    time_s: Some(t as f64),
                    future_distance_m: Some(d),
                    ..Default::default()
                },
            });
        }
        t += step;
    }
    None
}
