//! Per-message ingress pipeline binding the stores, the predictor bank
//! and the dispatcher.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::config::{EngineConfig, HISTORY_CAPACITY, MAX_NEIGHBOR_RESULTS};
use crate::dispatch::Dispatcher;
use crate::geo_index::GeoIndex;
use crate::geometry::{haversine_m, majority_heading};
use crate::history::SpeedHistory;
use crate::predictors::{self, PairContext};
use crate::sessions::{OutboundChannel, SessionRegistry};
use crate::status::{Counters, StatusSnapshot};
use crate::telemetry::{RawTelemetry, VehicleSample};
use crate::telemetry_store::{ttl_secs_for_speed, TelemetryStore};
use crate::threat::{Ack, ErrorAck, ThreatPayload};

/// Idle history buffers older than this are reclaimed by the sweeper.
const HISTORY_IDLE_MS: i64 = 60_000;

/// Reported linear accelerations at or above this (~0.8 g) are traced.
const HARD_ACCEL_MS2: f64 = 8.0;

/// The collision-prediction engine: all shared state plus the message
/// pipeline. One instance serves every connected session.
pub struct Engine {
    config: EngineConfig,
    geo: GeoIndex,
    store: TelemetryStore,
    history: SpeedHistory,
    sessions: Arc<SessionRegistry>,
    dispatcher: Dispatcher,
    pub counters: Counters,
    started: Instant,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        Self {
            config,
            geo: GeoIndex::new(),
            store: TelemetryStore::new(),
            history: SpeedHistory::new(HISTORY_CAPACITY),
            dispatcher: Dispatcher::new(sessions.clone()),
            sessions,
            counters: Counters::default(),
            started: Instant::now(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Process one inbound frame from `origin`.
    ///
    /// Messages from a single session arrive here sequentially, so every
    /// store write and dispatch of message N lands before message N+1
    /// starts. Between sessions there is no ordering.
    pub async fn handle_message(&self, raw: &str, origin: &OutboundChannel) {
        self.counters
            .messages_processed
            .fetch_add(1, Ordering::Relaxed);

        let parsed: RawTelemetry = match serde_json::from_str(raw) {
            Ok(p) => p,
            Err(e) => {
                self.counters.dropped_frames.fetch_add(1, Ordering::Relaxed);
                log::debug!("dropping unparseable frame: {}", e);
                return;
            }
        };

        let now_ms = Utc::now().timestamp_millis();
        let sample = match VehicleSample::from_raw(parsed, now_ms) {
            Ok(s) => s,
            Err(e) => {
                self.counters
                    .validation_failures
                    .fetch_add(1, Ordering::Relaxed);
                send_json(origin, &ErrorAck::new(e.to_string()));
                return;
            }
        };

        let accel_mag = sample.linear_accel_mag();
        if accel_mag >= HARD_ACCEL_MS2 {
            log::debug!(
                "{} reports {:.1} m/s^2 linear acceleration",
                sample.user_id,
                accel_mag
            );
        }

        // Geo entry and telemetry entry share one upsert boundary and TTL.
        let ttl_secs = ttl_secs_for_speed(sample.speed);
        self.geo
            .upsert(
                &sample.user_id,
                sample.latitude,
                sample.longitude,
                ttl_secs,
                now_ms,
            )
            .await;
        self.store.put(sample.clone(), ttl_secs, now_ms).await;
        self.history
            .append(&sample.user_id, sample.speed, now_ms)
            .await;
        self.sessions.bind(&sample.user_id, origin.clone());

        // A hard turn widens the search: threats may come from the blind spot.
        let mut radius_m = self.config.nearby_radius_m;
        if sample.is_sudden_turn(self.config.angular_vel_high_deg_s) {
            radius_m += self.config.blind_spot_radius_boost_m;
        }

        let neighbor_ids: Vec<String> = self
            .geo
            .radius_by_member(&sample.user_id, radius_m, MAX_NEIGHBOR_RESULTS, now_ms)
            .await
            .into_iter()
            .filter(|id| id != &sample.user_id)
            .collect();

        if neighbor_ids.is_empty() {
            send_json(
                origin,
                &Ack::received(Utc::now().to_rfc3339(), Vec::new()),
            );
            return;
        }

        let fetched = self.store.mget(&neighbor_ids, now_ms).await;

        let mut headings = vec![sample.heading];
        headings.extend(fetched.iter().flatten().map(|s| s.heading));
        let majority = majority_heading(&headings);

        let mut threats: Vec<ThreatPayload> = Vec::new();
        for (neighbor_id, maybe_sample) in neighbor_ids.iter().zip(fetched.into_iter()) {
            let Some(other) = maybe_sample else {
                log::debug!("neighbor {} has no live telemetry, skipping", neighbor_id);
                continue;
            };
            if now_ms - other.client_ts_ms > self.config.stale_ms {
                log::debug!(
                    "neighbor {} sample is {} ms old, skipping",
                    neighbor_id,
                    now_ms - other.client_ts_ms
                );
                continue;
            }

            let distance_m = haversine_m(
                sample.latitude,
                sample.longitude,
                other.latitude,
                other.longitude,
            );
            let other_history = self.history.latest(neighbor_id).await;

            let ctx = PairContext {
                cfg: &self.config,
                self_sample: &sample,
                other_sample: &other,
                distance_m,
                other_history: &other_history,
                majority_heading: majority,
            };
            if let Some(detection) = predictors::evaluate(&ctx) {
                log::info!(
                    "{} threat: {} -> {} ({:.1} m)",
                    detection.kind.as_str(),
                    sample.user_id,
                    other.user_id,
                    distance_m
                );
                self.counters.record_threat(detection.kind);
                let to_origin = self.dispatcher.dispatch(&detection, origin, &sample, &other);
                threats.push(to_origin);
            }
        }

        send_json(origin, &Ack::received(Utc::now().to_rfc3339(), threats));
    }

    /// Drop expired geo/telemetry entries and idle history windows.
    /// Correctness never depends on this; reads check TTLs themselves.
    pub async fn purge_expired(&self) -> (usize, usize, usize) {
        let now_ms = Utc::now().timestamp_millis();
        let geo = self.geo.purge_expired(now_ms).await;
        let telemetry = self.store.purge_expired(now_ms).await;
        let history = self.history.purge_idle(now_ms, HISTORY_IDLE_MS).await;
        (geo, telemetry, history)
    }

    pub async fn status(&self) -> StatusSnapshot {
        let now_ms = Utc::now().timestamp_millis();
        let threats = self.counters.threat_counts();
        StatusSnapshot {
            uptime_seconds: self.started.elapsed().as_secs(),
            active_vehicles: self.geo.active_count(now_ms).await,
            bound_sessions: self.sessions.bound_count(),
            messages_processed: self.counters.messages_processed.load(Ordering::Relaxed),
            validation_failures: self.counters.validation_failures.load(Ordering::Relaxed),
            dropped_frames: self.counters.dropped_frames.load(Ordering::Relaxed),
            threats_emitted: threats.total(),
            threats,
        }
    }
}

fn send_json<T: serde::Serialize>(channel: &OutboundChannel, value: &T) {
    match serde_json::to_string(value) {
        Ok(frame) => {
            if !channel.send(frame) {
                log::debug!("response dropped, origin channel closed");
            }
        }
        Err(e) => log::warn!("failed to encode response: {}", e),
    }
}
