//! Geodesy and closest-approach math shared by the predictor bank.
//!
//! Conventions used throughout the crate:
//! - Headings are compass bearings: 0° = north, increasing clockwise,
//!   normalized to [0, 360).
//! - The local tangent frame is 2D ENU: x = east meters, y = north meters.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Relative velocities below this (squared) are treated as parallel motion.
const CPA_EPS: f64 = 1e-6;

/// Great-circle distance in meters between two WGS-84 points.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Spherical forward projection: the point `dist_m` meters from
/// `(lat, lon)` along the compass bearing `bearing_deg`.
///
/// The returned longitude is wrapped to (-180, 180].
pub fn project_geodesic(lat: f64, lon: f64, bearing_deg: f64, dist_m: f64) -> (f64, f64) {
    let delta = dist_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    (phi2.to_degrees(), wrap_lon_deg(lambda2.to_degrees()))
}

fn wrap_lon_deg(lon: f64) -> f64 {
    let w = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if w == -180.0 {
        180.0
    } else {
        w
    }
}

/// Equirectangular projection of `(lat, lon)` into the tangent frame at
/// `(ref_lat, ref_lon)`. Returns (east_m, north_m). Only valid at short
/// range (hundreds of meters).
pub fn local_enu(ref_lat: f64, ref_lon: f64, lat: f64, lon: f64) -> (f64, f64) {
    let meters_per_deg_lon = METERS_PER_DEG_LAT * ref_lat.to_radians().cos();
    let east = (lon - ref_lon) * meters_per_deg_lon;
    let north = (lat - ref_lat) * METERS_PER_DEG_LAT;
    (east, north)
}

/// Decompose ground speed along a compass bearing into (east, north) m/s.
pub fn velocity_en(speed_ms: f64, heading_deg: f64) -> (f64, f64) {
    let h = heading_deg.to_radians();
    (speed_ms * h.sin(), speed_ms * h.cos())
}

/// Normalize any finite heading into [0, 360). Non-finite input maps to 0.
pub fn normalize_heading(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    deg.rem_euclid(360.0)
}

/// Smallest-arc difference between two headings, in [0, 180].
pub fn heading_diff(a_deg: f64, b_deg: f64) -> f64 {
    let d = (a_deg - b_deg).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Dominant travel direction of a set of headings: the argument of the
/// unit-vector sum, so 359° and 1° average to ~0° rather than 180°.
///
/// Returns `None` for an empty set or when the vectors cancel out.
pub fn majority_heading(headings_deg: &[f64]) -> Option<f64> {
    if headings_deg.is_empty() {
        return None;
    }
    let (sum_e, sum_n) = headings_deg.iter().fold((0.0, 0.0), |(e, n), h| {
        let r = h.to_radians();
        (e + r.sin(), n + r.cos())
    });
    if (sum_e * sum_e + sum_n * sum_n).sqrt() < 1e-9 {
        return None;
    }
    Some(normalize_heading(sum_e.atan2(sum_n).to_degrees()))
}

/// Closest point of approach between two straight-line trajectories.
#[derive(Clone, Copy, Debug)]
pub struct CpaTtc {
    /// Time of closest approach, clamped to [0, max_t].
    pub t_star: f64,
    /// Separation at `t_star`, meters.
    pub cpa_dist_m: f64,
    /// Self position at `t_star`, ENU meters.
    pub self_at: (f64, f64),
    /// Other position at `t_star`, ENU meters.
    pub other_at: (f64, f64),
    /// Current approach rate, m/s. Positive when converging.
    pub closing_speed_ms: f64,
}

/// Closed-form CPA/TTC for constant-velocity motion in the local frame.
///
/// `r = pos_other - pos_self`, `v = vel_other - vel_self`;
/// `t* = clamp(-(r·v)/|v|², 0, max_t)`. Near-zero relative velocity
/// degenerates to `t* = 0` with the current separation as the CPA.
pub fn compute_cpa_ttc(
    pos_self: (f64, f64),
    vel_self: (f64, f64),
    pos_other: (f64, f64),
    vel_other: (f64, f64),
    max_t: f64,
) -> CpaTtc {
    let r = (pos_other.0 - pos_self.0, pos_other.1 - pos_self.1);
    let v = (vel_other.0 - vel_self.0, vel_other.1 - vel_self.1);

    let r_norm = (r.0 * r.0 + r.1 * r.1).sqrt();
    let v_sq = v.0 * v.0 + v.1 * v.1;
    let rv = r.0 * v.0 + r.1 * v.1;

    let closing_speed_ms = if r_norm > 1e-9 { -rv / r_norm } else { 0.0 };

    let t_star = if v_sq <= CPA_EPS {
        0.0
    } else {
        (-rv / v_sq).clamp(0.0, max_t)
    };

    let self_at = (
        pos_self.0 + vel_self.0 * t_star,
        pos_self.1 + vel_self.1 * t_star,
    );
    let other_at = (
        pos_other.0 + vel_other.0 * t_star,
        pos_other.1 + vel_other.1 * t_star,
    );
    let de = other_at.0 - self_at.0;
    let dn = other_at.1 - self_at.1;

    CpaTtc {
        t_star,
        cpa_dist_m: (de * de + dn * dn).sqrt(),
        self_at,
        other_at,
        closing_speed_ms,
    }
}
