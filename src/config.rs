/// Tuning thresholds for the collision-prediction engine.
///
/// Every field has a baked-in default and can be overridden from the
/// process environment using the upper-snake names below. Bad override
/// values are logged and ignored rather than rejected at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base neighbor query radius (NEARBY_RADIUS_METERS).
    pub nearby_radius_m: f64,
    /// Max horizon for CPA-based predictors (PROJECTION_TIME_SECONDS).
    pub projection_time_s: f64,
    /// Baseline proximity threat cutoff (THREAT_DISTANCE_METERS). Reserved.
    pub threat_distance_m: f64,
    /// Minimum speed considered "moving" (MIN_MOVING_SPEED_MS).
    pub min_moving_speed_ms: f64,
    /// Sudden-turn yaw-rate threshold (ANGULAR_VEL_HIGH_DEG_S).
    pub angular_vel_high_deg_s: f64,
    /// Extra collision margin while turning sharply (UNCERTAINTY_INFLATION_METERS).
    pub uncertainty_inflation_m: f64,
    /// Extra query radius while turning sharply (BLIND_SPOT_RADIUS_BOOST_METERS).
    pub blind_spot_radius_boost_m: f64,
    /// Max age of a neighbor sample (STALE_MS).
    pub stale_ms: i64,
    /// Max time-to-CPA for the intersection predictor (TTC_MAX_SECONDS).
    pub ttc_max_s: f64,
    /// Strong-closing gate (CLOSING_SPEED_STRONG_MS). Reserved.
    pub closing_speed_strong_ms: f64,
    /// Predicted-collision horizon in seconds (LOOKAHEAD_S).
    pub lookahead_s: u32,
    /// Predicted-collision step in seconds (PREDICT_STEP).
    pub predict_step_s: u32,
    /// Predicted-collision distance cutoff (COLLISION_RADIUS_M).
    pub collision_radius_m: f64,
    /// Rear-end proximity cutoff (REAR_END_DISTANCE_M).
    pub rear_end_distance_m: f64,
    /// Rear-end deceleration trigger (SUDDEN_DECEL_MS2).
    pub sudden_decel_ms2: f64,
    /// Wrong-direction heading delta (WRONG_DIR_DIFF_DEG).
    pub wrong_dir_diff_deg: f64,
    /// Max lateral offset for the overtake predictor (OVERTAKE_SIDE_MAX_M).
    pub overtake_side_max_m: f64,
}

/// Neighbor query result cap.
pub const MAX_NEIGHBOR_RESULTS: usize = 50;

/// Telemetry TTL for vehicles moving faster than [`FAST_TTL_SPEED_MS`].
pub const FAST_TTL_SECS: i64 = 10;
/// Telemetry TTL for slow or parked vehicles.
pub const SLOW_TTL_SECS: i64 = 30;
/// Speed above which the short TTL applies.
pub const FAST_TTL_SPEED_MS: f64 = 5.0;

/// Retained speed samples per vehicle.
pub const HISTORY_CAPACITY: usize = 5;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nearby_radius_m: 75.0,
            projection_time_s: 3.0,
            threat_distance_m: 15.0,
            min_moving_speed_ms: 0.1,
            angular_vel_high_deg_s: 45.0,
            uncertainty_inflation_m: 5.0,
            blind_spot_radius_boost_m: 8.0,
            stale_ms: 4000,
            ttc_max_s: 3.0,
            closing_speed_strong_ms: 10.0,
            lookahead_s: 5,
            predict_step_s: 1,
            collision_radius_m: 4.0,
            rear_end_distance_m: 10.0,
            sudden_decel_ms2: 2.0,
            wrong_dir_diff_deg: 150.0,
            overtake_side_max_m: 4.0,
        }
    }
}

impl EngineConfig {
    /// Build a config from defaults, applying any environment overrides.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            nearby_radius_m: env_f64("NEARBY_RADIUS_METERS", d.nearby_radius_m),
            projection_time_s: env_f64("PROJECTION_TIME_SECONDS", d.projection_time_s),
            threat_distance_m: env_f64("THREAT_DISTANCE_METERS", d.threat_distance_m),
            min_moving_speed_ms: env_f64("MIN_MOVING_SPEED_MS", d.min_moving_speed_ms),
            angular_vel_high_deg_s: env_f64("ANGULAR_VEL_HIGH_DEG_S", d.angular_vel_high_deg_s),
            uncertainty_inflation_m: env_f64(
                "UNCERTAINTY_INFLATION_METERS",
                d.uncertainty_inflation_m,
            ),
            blind_spot_radius_boost_m: env_f64(
                "BLIND_SPOT_RADIUS_BOOST_METERS",
                d.blind_spot_radius_boost_m,
            ),
            stale_ms: env_i64("STALE_MS", d.stale_ms),
            ttc_max_s: env_f64("TTC_MAX_SECONDS", d.ttc_max_s),
            closing_speed_strong_ms: env_f64("CLOSING_SPEED_STRONG_MS", d.closing_speed_strong_ms),
            lookahead_s: env_u32("LOOKAHEAD_S", d.lookahead_s),
            predict_step_s: env_u32("PREDICT_STEP", d.predict_step_s),
            collision_radius_m: env_f64("COLLISION_RADIUS_M", d.collision_radius_m),
            rear_end_distance_m: env_f64("REAR_END_DISTANCE_M", d.rear_end_distance_m),
            sudden_decel_ms2: env_f64("SUDDEN_DECEL_MS2", d.sudden_decel_ms2),
            wrong_dir_diff_deg: env_f64("WRONG_DIR_DIFF_DEG", d.wrong_dir_diff_deg),
            overtake_side_max_m: env_f64("OVERTAKE_SIDE_MAX_M", d.overtake_side_max_m),
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                log::warn!("ignoring non-numeric {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("ignoring non-numeric {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("ignoring non-numeric {}={:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}
