//! Last-known telemetry per vehicle, with per-key TTL.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::config::{FAST_TTL_SECS, FAST_TTL_SPEED_MS, SLOW_TTL_SECS};
use crate::telemetry::VehicleSample;

#[derive(Clone, Debug)]
struct StoredSample {
    sample: VehicleSample,
    expires_at_ms: i64,
}

/// Fast movers refresh often, so their records can expire quickly; parked
/// vehicles keep a longer window.
pub fn ttl_secs_for_speed(speed_ms: f64) -> i64 {
    if speed_ms > FAST_TTL_SPEED_MS {
        FAST_TTL_SECS
    } else {
        SLOW_TTL_SECS
    }
}

/// Shared key-value store of the latest sample per vehicle id.
pub struct TelemetryStore {
    inner: RwLock<HashMap<String, StoredSample>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn put(&self, sample: VehicleSample, ttl_secs: i64, now_ms: i64) {
        let mut inner = self.inner.write().await;
        inner.insert(
            sample.user_id.clone(),
            StoredSample {
                sample,
                expires_at_ms: now_ms + ttl_secs * 1000,
            },
        );
    }

    /// Batch get, preserving the order of `ids`. Missing or expired keys
    /// come back as `None`.
    pub async fn mget(&self, ids: &[String], now_ms: i64) -> Vec<Option<VehicleSample>> {
        let inner = self.inner.read().await;
        ids.iter()
            .map(|id| {
                inner
                    .get(id)
                    .filter(|s| s.expires_at_ms > now_ms)
                    .map(|s| s.sample.clone())
            })
            .collect()
    }

    pub async fn purge_expired(&self, now_ms: i64) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.len();
        inner.retain(|_, s| s.expires_at_ms > now_ms);
        before - inner.len()
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RawTelemetry;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn sample(id: &str, speed: f64) -> VehicleSample {
        let raw = RawTelemetry {
            user_id: Some(id.to_string()),
            latitude: Some(0.0),
            longitude: Some(0.0),
            speed: Some(speed),
            ..Default::default()
        };
        VehicleSample::from_raw(raw, NOW_MS).unwrap()
    }

    #[test]
    fn test_ttl_tracks_speed() {
        assert_eq!(ttl_secs_for_speed(10.0), 10);
        assert_eq!(ttl_secs_for_speed(5.0), 30);
        assert_eq!(ttl_secs_for_speed(0.0), 30);
    }

    #[tokio::test]
    async fn test_mget_preserves_order_with_gaps() {
        let store = TelemetryStore::new();
        store.put(sample("a", 1.0), 30, NOW_MS).await;
        store.put(sample("c", 1.0), 30, NOW_MS).await;

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let got = store.mget(&ids, NOW_MS).await;
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].as_ref().unwrap().user_id, "a");
        assert!(got[1].is_none());
        assert_eq!(got[2].as_ref().unwrap().user_id, "c");
    }

    #[tokio::test]
    async fn test_expiry_and_overwrite() {
        let store = TelemetryStore::new();
        store.put(sample("a", 1.0), 10, NOW_MS).await;

        let got = store.mget(&["a".to_string()], NOW_MS + 11_000).await;
        assert!(got[0].is_none());

        // A fresh put resurrects the key with a new deadline.
        store.put(sample("a", 2.0), 10, NOW_MS + 11_000).await;
        let got = store.mget(&["a".to_string()], NOW_MS + 12_000).await;
        assert_eq!(got[0].as_ref().unwrap().speed, 2.0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = TelemetryStore::new();
        store.put(sample("a", 10.0), 10, NOW_MS).await;
        store.put(sample("b", 1.0), 30, NOW_MS).await;

        assert_eq!(store.purge_expired(NOW_MS + 15_000).await, 1);
        let got = store.mget(&["b".to_string()], NOW_MS + 15_000).await;
        assert!(got[0].is_some());
    }
}
