//! Process-wide counters and the status snapshot served over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::threat::ThreatKind;

/// Lock-free counters updated by the message pipeline.
#[derive(Default)]
pub struct Counters {
    pub messages_processed: AtomicU64,
    pub validation_failures: AtomicU64,
    pub dropped_frames: AtomicU64,
    predicted_collision: AtomicU64,
    rear_end: AtomicU64,
    wrong_direction: AtomicU64,
    intersection_collision: AtomicU64,
    overtake: AtomicU64,
}

impl Counters {
    pub fn record_threat(&self, kind: ThreatKind) {
        let counter = match kind {
            ThreatKind::PredictedCollision => &self.predicted_collision,
            ThreatKind::RearEnd => &self.rear_end,
            ThreatKind::WrongDirection => &self.wrong_direction,
            ThreatKind::IntersectionCollision => &self.intersection_collision,
            ThreatKind::Overtake => &self.overtake,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn threat_counts(&self) -> ThreatCounts {
        ThreatCounts {
            predicted_collision: self.predicted_collision.load(Ordering::Relaxed),
            rear_end: self.rear_end.load(Ordering::Relaxed),
            wrong_direction: self.wrong_direction.load(Ordering::Relaxed),
            intersection_collision: self.intersection_collision.load(Ordering::Relaxed),
            overtake: self.overtake.load(Ordering::Relaxed),
        }
    }
}

/// Emitted threats broken down by kind.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ThreatCounts {
    pub predicted_collision: u64,
    pub rear_end: u64,
    pub wrong_direction: u64,
    pub intersection_collision: u64,
    pub overtake: u64,
}

impl ThreatCounts {
    pub fn total(&self) -> u64 {
        self.predicted_collision
            + self.rear_end
            + self.wrong_direction
            + self.intersection_collision
            + self.overtake
    }
}

/// Snapshot returned by `GET /`.
#[derive(Clone, Debug, Serialize)]
pub struct StatusSnapshot {
    pub uptime_seconds: u64,
    pub active_vehicles: usize,
    pub bound_sessions: usize,
    pub messages_processed: u64,
    pub validation_failures: u64,
    pub dropped_frames: u64,
    pub threats_emitted: u64,
    pub threats: ThreatCounts,
}
