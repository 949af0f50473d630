//! Short rolling window of recent speed samples per vehicle.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;

/// One observed speed with its server receive time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedSample {
    pub speed: f64,
    pub server_ms: i64,
}

/// Process-local bounded speed history, FIFO per vehicle.
pub struct SpeedHistory {
    inner: RwLock<HashMap<String, VecDeque<SpeedSample>>>,
    capacity: usize,
}

impl SpeedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn append(&self, id: &str, speed: f64, server_ms: i64) {
        let mut inner = self.inner.write().await;
        let window = inner
            .entry(id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        window.push_back(SpeedSample { speed, server_ms });
        while window.len() > self.capacity {
            window.pop_front();
        }
    }

    /// Retained samples, oldest first.
    pub async fn latest(&self, id: &str) -> Vec<SpeedSample> {
        let inner = self.inner.read().await;
        inner
            .get(id)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop vehicles whose newest sample is older than `max_age_ms`.
    pub async fn purge_idle(&self, now_ms: i64, max_age_ms: i64) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.len();
        inner.retain(|_, w| {
            w.back()
                .map(|s| now_ms - s.server_ms <= max_age_ms)
                .unwrap_or(false)
        });
        before - inner.len()
    }
}
