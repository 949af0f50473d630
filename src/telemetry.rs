//! Wire-format telemetry and its normalized in-memory form.
//!
//! Client payloads are deliberately lenient: anything JSON-shaped is
//! accepted by serde, and [`VehicleSample::from_raw`] applies the
//! parse-and-default rules (heading wrap, speed clamp, yaw-rate unit
//! heuristic) or rejects the message with a typed validation error.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geometry::{normalize_heading, velocity_en};

/// 3-axis sensor reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vec3 {
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Client wall time: epoch milliseconds or an RFC 3339 string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Millis(f64),
    Text(String),
}

/// One telemetry message exactly as it arrives on the channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTelemetry {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub accel: Option<Vec3>,
    #[serde(default)]
    pub gyro: Option<Vec3>,
    #[serde(rename = "horizontalAccuracy", default)]
    pub horizontal_accuracy: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<TimestampValue>,
}

/// Validated, normalized last-known state of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSample {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Ground speed, m/s, clamped to be finite and non-negative.
    pub speed: f64,
    /// Compass bearing in [0, 360).
    pub heading: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accel: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gyro: Option<Vec3>,
    #[serde(
        rename = "horizontalAccuracy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub horizontal_accuracy: Option<f64>,
    /// Client wall time in epoch ms; falls back to server receive time.
    #[serde(rename = "clientTsMs")]
    pub client_ts_ms: i64,
}

impl VehicleSample {
    /// Validate and normalize a raw message received at `server_now_ms`.
    pub fn from_raw(raw: RawTelemetry, server_now_ms: i64) -> Result<Self, ValidationError> {
        let user_id = match raw.user_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(ValidationError::MissingUserId),
        };
        let latitude = raw
            .latitude
            .filter(|v| v.is_finite())
            .ok_or(ValidationError::InvalidCoordinates)?;
        let longitude = raw
            .longitude
            .filter(|v| v.is_finite())
            .ok_or(ValidationError::InvalidCoordinates)?;

        Ok(Self {
            user_id,
            latitude,
            longitude,
            speed: sanitize_speed(raw.speed.unwrap_or(0.0)),
            heading: normalize_heading(raw.heading.unwrap_or(0.0)),
            accel: raw.accel,
            gyro: raw.gyro,
            horizontal_accuracy: raw.horizontal_accuracy.filter(|v| v.is_finite()),
            client_ts_ms: parse_timestamp_ms(raw.timestamp.as_ref()).unwrap_or(server_now_ms),
        })
    }

    /// Yaw rate in deg/s. Small gyro-z magnitudes are assumed to be rad/s
    /// (phone sensor APIs) and converted; larger ones are already deg/s.
    pub fn yaw_rate_deg_s(&self) -> f64 {
        let z = self.gyro.map(|g| g.z).unwrap_or(0.0);
        if !z.is_finite() {
            return 0.0;
        }
        if z.abs() < 0.5 {
            z.to_degrees()
        } else {
            z
        }
    }

    /// Magnitude of the reported linear acceleration, m/s².
    pub fn linear_accel_mag(&self) -> f64 {
        self.accel.map(|a| a.magnitude()).unwrap_or(0.0)
    }

    /// Ground velocity in the local (east, north) frame.
    pub fn velocity_en(&self) -> (f64, f64) {
        velocity_en(self.speed, self.heading)
    }

    pub fn is_sudden_turn(&self, yaw_threshold_deg_s: f64) -> bool {
        self.yaw_rate_deg_s().abs() >= yaw_threshold_deg_s
    }
}

fn sanitize_speed(speed: f64) -> f64 {
    if !speed.is_finite() {
        return 0.0;
    }
    speed.max(0.0)
}

fn parse_timestamp_ms(value: Option<&TimestampValue>) -> Option<i64> {
    match value? {
        TimestampValue::Millis(ms) if ms.is_finite() && *ms > 0.0 => Some(*ms as i64),
        TimestampValue::Millis(_) => None,
        TimestampValue::Text(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp_millis());
            }
            // Some clients send epoch millis as a string.
            match s.trim().parse::<f64>() {
                Ok(ms) if ms.is_finite() && ms > 0.0 => Some(ms as i64),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn raw(user_id: &str, lat: f64, lon: f64) -> RawTelemetry {
        RawTelemetry {
            user_id: Some(user_id.to_string()),
            latitude: Some(lat),
            longitude: Some(lon),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_user_id_rejected() {
        let mut r = raw("", 1.0, 2.0);
        assert_eq!(
            VehicleSample::from_raw(r.clone(), NOW_MS),
            Err(ValidationError::MissingUserId)
        );
        r.user_id = None;
        assert_eq!(
            VehicleSample::from_raw(r, NOW_MS),
            Err(ValidationError::MissingUserId)
        );
    }

    #[test]
    fn test_missing_coordinates_rejected() {
        let mut r = raw("veh-1", 1.0, 2.0);
        r.longitude = None;
        assert_eq!(
            VehicleSample::from_raw(r, NOW_MS),
            Err(ValidationError::InvalidCoordinates)
        );

        let mut r = raw("veh-1", 1.0, 2.0);
        r.latitude = Some(f64::NAN);
        assert_eq!(
            VehicleSample::from_raw(r, NOW_MS),
            Err(ValidationError::InvalidCoordinates)
        );
    }

    #[test]
    fn test_speed_and_heading_normalized() {
        let mut r = raw("veh-1", 0.0, 0.0);
        r.speed = Some(-3.0);
        r.heading = Some(450.0);
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.speed, 0.0);
        assert_eq!(s.heading, 90.0);

        let mut r = raw("veh-1", 0.0, 0.0);
        r.speed = Some(f64::INFINITY);
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.speed, 0.0);
    }

    #[test]
    fn test_yaw_rate_unit_heuristic() {
        let mut r = raw("veh-1", 0.0, 0.0);
        r.gyro = Some(Vec3 {
            x: 0.0,
            y: 0.0,
            z: 0.3,
        });
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        // 0.3 rad/s -> ~17.19 deg/s
        assert!((s.yaw_rate_deg_s() - 0.3f64.to_degrees()).abs() < 1e-9);

        let mut r = raw("veh-1", 0.0, 0.0);
        r.gyro = Some(Vec3 {
            x: 0.0,
            y: 0.0,
            z: 50.0,
        });
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.yaw_rate_deg_s(), 50.0);
        assert!(s.is_sudden_turn(45.0));
    }

    #[test]
    fn test_timestamp_forms() {
        let mut r = raw("veh-1", 0.0, 0.0);
        r.timestamp = Some(TimestampValue::Millis(1_700_000_123_456.0));
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.client_ts_ms, 1_700_000_123_456);

        let mut r = raw("veh-1", 0.0, 0.0);
        r.timestamp = Some(TimestampValue::Text("2023-11-14T22:13:20Z".to_string()));
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.client_ts_ms, 1_700_000_000_000);

        // Unparseable falls back to server receive time
        let mut r = raw("veh-1", 0.0, 0.0);
        r.timestamp = Some(TimestampValue::Text("yesterday".to_string()));
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.client_ts_ms, NOW_MS);
    }

    #[test]
    fn test_accel_magnitude() {
        let mut r = raw("veh-1", 0.0, 0.0);
        r.accel = Some(Vec3 {
            x: 3.0,
            y: 4.0,
            z: 0.0,
        });
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.linear_accel_mag(), 5.0);
    }

    #[test]
    fn test_wire_field_names() {
        let json = r#"{"userId":"veh-9","latitude":1.5,"longitude":2.5,
                       "speed":12.0,"heading":270.0,
                       "horizontalAccuracy":3.5,"timestamp":1700000000000}"#;
        let r: RawTelemetry = serde_json::from_str(json).unwrap();
        let s = VehicleSample::from_raw(r, NOW_MS).unwrap();
        assert_eq!(s.user_id, "veh-9");
        assert_eq!(s.horizontal_accuracy, Some(3.5));
        assert_eq!(s.heading, 270.0);
    }
}
