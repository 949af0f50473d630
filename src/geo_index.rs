//! Expiring spatial index over the active fleet.
//!
//! # Architecture
//! - One point entry per vehicle id, kept in an R-Tree for envelope queries
//!   and in a side map for O(1) upsert-by-id.
//! - Radius queries pre-filter with a degree-space bounding box, then apply
//!   the exact haversine distance in meters.
//! - Entries carry their own expiry; expired entries are invisible to
//!   queries and reclaimed by the periodic sweep.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};
use tokio::sync::RwLock;

use crate::geometry::{haversine_m, METERS_PER_DEG_LAT};

#[derive(Clone, Debug, PartialEq)]
struct GeoEntry {
    id: String,
    lat: f64,
    lon: f64,
    expires_at_ms: i64,
}

impl RTreeObject for GeoEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lon, self.lat])
    }
}

#[derive(Default)]
struct Inner {
    tree: RTree<GeoEntry>,
    by_id: HashMap<String, GeoEntry>,
}

/// Shared, concurrently updated vehicle position index.
pub struct GeoIndex {
    inner: RwLock<Inner>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Insert or move a vehicle, refreshing its expiry.
    pub async fn upsert(&self, id: &str, lat: f64, lon: f64, ttl_secs: i64, now_ms: i64) {
        let entry = GeoEntry {
            id: id.to_string(),
            lat,
            lon,
            expires_at_ms: now_ms + ttl_secs * 1000,
        };
        let mut inner = self.inner.write().await;
        if let Some(old) = inner.by_id.remove(id) {
            inner.tree.remove(&old);
        }
        inner.tree.insert(entry.clone());
        inner.by_id.insert(entry.id.clone(), entry);
    }

    /// Ids within `radius_m` meters of the member `id`, the member itself
    /// included. Unknown or expired members yield an empty result. At most
    /// `max_count` ids are returned; ordering is unspecified.
    pub async fn radius_by_member(
        &self,
        id: &str,
        radius_m: f64,
        max_count: usize,
        now_ms: i64,
    ) -> Vec<String> {
        let inner = self.inner.read().await;
        let center = match inner.by_id.get(id) {
            Some(e) if e.expires_at_ms > now_ms => e.clone(),
            _ => return Vec::new(),
        };

        // Bounding box in degrees; longitude widens with latitude.
        let lat_span = radius_m / METERS_PER_DEG_LAT;
        let lon_span =
            radius_m / (METERS_PER_DEG_LAT * center.lat.to_radians().cos().abs().max(0.01));
        let envelope = AABB::from_corners(
            [center.lon - lon_span, center.lat - lat_span],
            [center.lon + lon_span, center.lat + lat_span],
        );

        inner
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|e| e.expires_at_ms > now_ms)
            .filter(|e| haversine_m(center.lat, center.lon, e.lat, e.lon) <= radius_m)
            .take(max_count)
            .map(|e| e.id.clone())
            .collect()
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self, now_ms: i64) -> usize {
        let mut inner = self.inner.write().await;
        let dead: Vec<GeoEntry> = inner
            .by_id
            .values()
            .filter(|e| e.expires_at_ms <= now_ms)
            .cloned()
            .collect();
        for entry in &dead {
            inner.by_id.remove(&entry.id);
            inner.tree.remove(entry);
        }
        dead.len()
    }

    /// Number of unexpired entries.
    pub async fn active_count(&self, now_ms: i64) -> usize {
        let inner = self.inner.read().await;
        inner
            .by_id
            .values()
            .filter(|e| e.expires_at_ms > now_ms)
            .count()
    }
}

impl Default for GeoIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_MS: i64 = 1_700_000_000_000;

    #[tokio::test]
    async fn test_member_always_sees_itself() {
        let index = GeoIndex::new();
        index.upsert("veh-a", 10.0, 20.0, 10, NOW_MS).await;

        let hits = index.radius_by_member("veh-a", 0.0, 50, NOW_MS).await;
        assert_eq!(hits, vec!["veh-a".to_string()]);
    }

    #[tokio::test]
    async fn test_radius_filtering() {
        let index = GeoIndex::new();
        index.upsert("center", 0.0, 0.0, 30, NOW_MS).await;
        // ~55.6 m east
        index.upsert("near", 0.0, 0.0005, 30, NOW_MS).await;
        // ~111 m east
        index.upsert("far", 0.0, 0.001, 30, NOW_MS).await;

        let mut hits = index.radius_by_member("center", 75.0, 50, NOW_MS).await;
        hits.sort();
        assert_eq!(hits, vec!["center".to_string(), "near".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_member_empty() {
        let index = GeoIndex::new();
        index.upsert("veh-a", 0.0, 0.0, 10, NOW_MS).await;
        assert!(index
            .radius_by_member("ghost", 100.0, 50, NOW_MS)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_invisible() {
        let index = GeoIndex::new();
        index.upsert("center", 0.0, 0.0, 30, NOW_MS).await;
        index.upsert("brief", 0.0, 0.0002, 10, NOW_MS).await;

        let later = NOW_MS + 11_000;
        let hits = index.radius_by_member("center", 100.0, 50, later).await;
        assert_eq!(hits, vec!["center".to_string()]);

        // An expired query member sees nothing, itself included.
        let gone = NOW_MS + 31_000;
        assert!(index
            .radius_by_member("center", 100.0, 50, gone)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_upsert_moves_entry() {
        let index = GeoIndex::new();
        index.upsert("center", 0.0, 0.0, 30, NOW_MS).await;
        index.upsert("mover", 0.0, 0.0002, 30, NOW_MS).await;
        // Re-upsert far away: the old location must not match anymore.
        index.upsert("mover", 1.0, 1.0, 30, NOW_MS).await;

        let hits = index.radius_by_member("center", 100.0, 50, NOW_MS).await;
        assert_eq!(hits, vec!["center".to_string()]);
        assert_eq!(index.active_count(NOW_MS).await, 2);
    }

    #[tokio::test]
    async fn test_max_count_truncates() {
        let index = GeoIndex::new();
        for i in 0..10 {
            let lon = i as f64 * 0.00001;
            index.upsert(&format!("veh-{}", i), 0.0, lon, 30, NOW_MS).await;
        }
        let hits = index.radius_by_member("veh-0", 100.0, 4, NOW_MS).await;
        assert_eq!(hits.len(), 4);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let index = GeoIndex::new();
        index.upsert("short", 0.0, 0.0, 10, NOW_MS).await;
        index.upsert("long", 0.0, 0.001, 30, NOW_MS).await;

        let removed = index.purge_expired(NOW_MS + 15_000).await;
        assert_eq!(removed, 1);
        assert_eq!(index.active_count(NOW_MS + 15_000).await, 1);
    }
}
