//! Threat records and the wire envelopes built from them.

use serde::{Deserialize, Serialize};

use crate::telemetry::VehicleSample;

/// The five hazard classes the predictor bank can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    PredictedCollision,
    RearEnd,
    WrongDirection,
    IntersectionCollision,
    Overtake,
}

impl ThreatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatKind::PredictedCollision => "predicted_collision",
            ThreatKind::RearEnd => "rear_end",
            ThreatKind::WrongDirection => "wrong_direction",
            ThreatKind::IntersectionCollision => "intersection_collision",
            ThreatKind::Overtake => "overtake",
        }
    }
}

/// Numbers attached to a detection. Which fields are set is determined by
/// the threat kind; unset fields are omitted from the wire form.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ThreatMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub future_distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceleration: Option<f64>,
    #[serde(rename = "timeToCPA_s", skip_serializing_if = "Option::is_none")]
    pub time_to_cpa_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lateral_m: Option<f64>,
}

/// Outcome of the predictor bank for one (reporter, counterpart) pair,
/// before it is rendered for a specific recipient.
#[derive(Clone, Debug)]
pub struct Detection {
    pub kind: ThreatKind,
    pub metrics: ThreatMetrics,
}

/// The counterpart vehicle as embedded in a threat payload.
#[derive(Clone, Debug, Serialize)]
pub struct SourceVehicle {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
}

impl From<&VehicleSample> for SourceVehicle {
    fn from(s: &VehicleSample) -> Self {
        Self {
            user_id: s.user_id.clone(),
            latitude: s.latitude,
            longitude: s.longitude,
            speed: s.speed,
            heading: s.heading,
        }
    }
}

/// Recipient-relative threat notification: `id`/`lat`/`lng` and
/// `sourceVehicle` always describe the *other* vehicle as seen by the
/// recipient.
#[derive(Clone, Debug, Serialize)]
pub struct ThreatPayload {
    #[serde(rename = "type")]
    pub kind: ThreatKind,
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "sourceVehicle")]
    pub source_vehicle: SourceVehicle,
    #[serde(flatten)]
    pub metrics: ThreatMetrics,
    pub message: String,
}

impl ThreatPayload {
    /// Render a detection for one recipient, with `counterpart` being the
    /// other endpoint of the interaction.
    pub fn for_recipient(detection: &Detection, counterpart: &VehicleSample) -> Self {
        Self {
            kind: detection.kind,
            id: counterpart.user_id.clone(),
            lat: counterpart.latitude,
            lng: counterpart.longitude,
            source_vehicle: SourceVehicle::from(counterpart),
            metrics: detection.metrics,
            message: describe(detection, &counterpart.user_id),
        }
    }
}

fn describe(detection: &Detection, counterpart_id: &str) -> String {
    let m = &detection.metrics;
    match detection.kind {
        ThreatKind::PredictedCollision => format!(
            "Predicted collision with {} in {:.0} s ({:.1} m apart)",
            counterpart_id,
            m.time_s.unwrap_or(0.0),
            m.future_distance_m.unwrap_or(0.0)
        ),
        ThreatKind::RearEnd => format!(
            "Vehicle {} braking hard ({:.1} m/s^2) {:.1} m away",
            counterpart_id,
            m.deceleration.unwrap_or(0.0),
            m.distance_m.unwrap_or(0.0)
        ),
        ThreatKind::WrongDirection => format!(
            "Vehicle {} moving against traffic {:.0} m away",
            counterpart_id,
            m.distance_m.unwrap_or(0.0)
        ),
        ThreatKind::IntersectionCollision => format!(
            "Crossing vehicle {}: paths meet in {:.1} s",
            counterpart_id,
            m.time_to_cpa_s.unwrap_or(0.0)
        ),
        ThreatKind::Overtake => format!(
            "Vehicle {} overtaking {:.1} m to the side",
            counterpart_id,
            m.lateral_m.unwrap_or(0.0)
        ),
    }
}

/// Push envelope delivered to a bound counterpart channel.
#[derive(Clone, Debug, Serialize)]
pub struct ThreatPush {
    pub status: &'static str,
    pub data: ThreatPayload,
}

impl ThreatPush {
    pub fn new(data: ThreatPayload) -> Self {
        Self {
            status: "threat",
            data,
        }
    }
}

/// Acknowledgment returned to the origin after each processed message.
#[derive(Clone, Debug, Serialize)]
pub struct Ack {
    pub status: &'static str,
    pub timestamp: String,
    pub threats: Vec<ThreatPayload>,
}

impl Ack {
    pub fn received(timestamp: String, threats: Vec<ThreatPayload>) -> Self {
        Self {
            status: "received",
            timestamp,
            threats,
        }
    }
}

/// Error acknowledgment for messages that fail validation.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorAck {
    pub status: &'static str,
    pub reason: String,
}

impl ErrorAck {
    pub fn new(reason: String) -> Self {
        Self {
            status: "error",
            reason,
        }
    }
}
