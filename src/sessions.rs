//! Vehicle id to message-channel bindings for push delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Write end of one connected session's outbound frame queue.
///
/// Sends never block: frames are queued on an unbounded channel drained by
/// the socket task, and sends to a closed channel are no-ops.
#[derive(Clone, Debug)]
pub struct OutboundChannel {
    id: u64,
    tx: UnboundedSender<String>,
}

impl OutboundChannel {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self {
            id: NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    pub fn channel_id(&self) -> u64 {
        self.id
    }

    /// Queue a frame for delivery. Returns false if the peer is gone.
    pub fn send(&self, frame: String) -> bool {
        self.tx.send(frame).is_ok()
    }
}

/// Current channel per vehicle id. A new telemetry message rebinds its id
/// to whichever channel delivered it; closing a channel removes every
/// binding pointing at it.
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, OutboundChannel>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn bind(&self, user_id: &str, channel: OutboundChannel) {
        let mut inner = self.inner.lock().expect("session registry poisoned");
        inner.insert(user_id.to_string(), channel);
    }

    pub fn lookup(&self, user_id: &str) -> Option<OutboundChannel> {
        let inner = self.inner.lock().expect("session registry poisoned");
        inner.get(user_id).cloned()
    }

    /// Unbind every id attached to `channel_id`. Returns how many were removed.
    pub fn remove_channel(&self, channel_id: u64) -> usize {
        let mut inner = self.inner.lock().expect("session registry poisoned");
        let before = inner.len();
        inner.retain(|_, ch| ch.channel_id() != channel_id);
        before - inner.len()
    }

    pub fn bound_count(&self) -> usize {
        let inner = self.inner.lock().expect("session registry poisoned");
        inner.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn channel() -> (OutboundChannel, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (OutboundChannel::new(tx), rx)
    }

    #[test]
    fn test_bind_lookup_roundtrip() {
        let registry = SessionRegistry::new();
        let (ch, mut rx) = channel();
        registry.bind("veh-a", ch);

        let found = registry.lookup("veh-a").unwrap();
        assert!(found.send("hello".to_string()));
        assert_eq!(rx.try_recv().unwrap(), "hello");
        assert!(registry.lookup("veh-b").is_none());
    }

    #[test]
    fn test_rebind_overrides() {
        let registry = SessionRegistry::new();
        let (ch1, _rx1) = channel();
        let (ch2, mut rx2) = channel();
        let id2 = ch2.channel_id();

        registry.bind("veh-a", ch1);
        registry.bind("veh-a", ch2);

        let found = registry.lookup("veh-a").unwrap();
        assert_eq!(found.channel_id(), id2);
        found.send("to-second".to_string());
        assert_eq!(rx2.try_recv().unwrap(), "to-second");
        assert_eq!(registry.bound_count(), 1);
    }

    #[test]
    fn test_remove_channel_drops_all_bindings() {
        let registry = SessionRegistry::new();
        let (shared, _rx) = channel();
        let (other, _rx2) = channel();

        registry.bind("veh-a", shared.clone());
        registry.bind("veh-b", shared.clone());
        registry.bind("veh-c", other);

        assert_eq!(registry.remove_channel(shared.channel_id()), 2);
        assert!(registry.lookup("veh-a").is_none());
        assert!(registry.lookup("veh-b").is_none());
        assert!(registry.lookup("veh-c").is_some());
    }

    #[test]
    fn test_send_to_closed_channel_is_noop() {
        let registry = SessionRegistry::new();
        let (ch, rx) = channel();
        registry.bind("veh-a", ch);
        drop(rx);

        let found = registry.lookup("veh-a").unwrap();
        assert!(!found.send("lost".to_string()));
    }
}
