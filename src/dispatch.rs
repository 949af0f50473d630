//! Threat fan-out to the two endpoints of an interaction.

use std::sync::Arc;

use crate::sessions::{OutboundChannel, SessionRegistry};
use crate::telemetry::VehicleSample;
use crate::threat::{Detection, ThreatPayload, ThreatPush};

/// Routes threat notifications: the origin channel always gets a push,
/// the counterpart gets one when a session is bound for it. Delivery
/// failures never propagate into the pipeline.
pub struct Dispatcher {
    sessions: Arc<SessionRegistry>,
}

impl Dispatcher {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }

    /// Build both recipient-relative payloads and push them out. Returns
    /// the origin's copy for inclusion in the acknowledgment.
    pub fn dispatch(
        &self,
        detection: &Detection,
        origin: &OutboundChannel,
        origin_sample: &VehicleSample,
        counterpart_sample: &VehicleSample,
    ) -> ThreatPayload {
        let to_origin = ThreatPayload::for_recipient(detection, counterpart_sample);
        let to_counterpart = ThreatPayload::for_recipient(detection, origin_sample);

        push(origin, &to_origin);

        match self.sessions.lookup(&counterpart_sample.user_id) {
            Some(channel) => push(&channel, &to_counterpart),
            None => log::debug!(
                "no session bound for {}, counterpart push skipped",
                counterpart_sample.user_id
            ),
        }

        to_origin
    }
}

fn push(channel: &OutboundChannel, payload: &ThreatPayload) {
    match serde_json::to_string(&ThreatPush::new(payload.clone())) {
        Ok(frame) => {
            if !channel.send(frame) {
                log::debug!("threat push to {} dropped, channel closed", payload.id);
            }
        }
        Err(e) => log::warn!("failed to encode threat push: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RawTelemetry;
    use crate::threat::{ThreatKind, ThreatMetrics};
    use tokio::sync::mpsc;

    fn sample(id: &str, lat: f64) -> VehicleSample {
        let raw = RawTelemetry {
            user_id: Some(id.to_string()),
            latitude: Some(lat),
            longitude: Some(0.0),
            speed: Some(10.0),
            heading: Some(90.0),
            ..Default::default()
        };
        VehicleSample::from_raw(raw, 0).unwrap()
    }

    fn detection() -> Detection {
        Detection {
            kind: ThreatKind::WrongDirection,
            metrics: ThreatMetrics {
                distance_m: Some(20.0),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_both_endpoints_notified() {
        let sessions = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(sessions.clone());

        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let origin = OutboundChannel::new(a_tx);
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        sessions.bind("veh-b", OutboundChannel::new(b_tx));

        let a = sample("veh-a", 0.0);
        let b = sample("veh-b", 0.0002);
        let ack_copy = dispatcher.dispatch(&detection(), &origin, &a, &b);

        // Each recipient sees the other vehicle in the payload.
        assert_eq!(ack_copy.id, "veh-b");
        let to_a: serde_json::Value = serde_json::from_str(&a_rx.try_recv().unwrap()).unwrap();
        assert_eq!(to_a["status"], "threat");
        assert_eq!(to_a["data"]["id"], "veh-b");

        let to_b: serde_json::Value = serde_json::from_str(&b_rx.try_recv().unwrap()).unwrap();
        assert_eq!(to_b["data"]["id"], "veh-a");
        assert_eq!(to_b["data"]["sourceVehicle"]["userId"], "veh-a");
    }

    #[test]
    fn test_unbound_counterpart_skipped() {
        let sessions = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(sessions);

        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let origin = OutboundChannel::new(a_tx);

        let a = sample("veh-a", 0.0);
        let b = sample("veh-b", 0.0002);
        dispatcher.dispatch(&detection(), &origin, &a, &b);

        // Origin still receives its push.
        assert!(a_rx.try_recv().is_ok());
    }

    #[test]
    fn test_closed_counterpart_channel_swallowed() {
        let sessions = Arc::new(SessionRegistry::new());
        let dispatcher = Dispatcher::new(sessions.clone());

        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let origin = OutboundChannel::new(a_tx);
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        sessions.bind("veh-b", OutboundChannel::new(b_tx));
        drop(b_rx);

        let a = sample("veh-a", 0.0);
        let b = sample("veh-b", 0.0002);
        // Must not panic or error out.
        dispatcher.dispatch(&detection(), &origin, &a, &b);
        assert!(a_rx.try_recv().is_ok());
    }
}
