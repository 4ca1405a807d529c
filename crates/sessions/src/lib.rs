//! Session store: the only shared mutable state in the service.
//!
//! Sessions are keyed by call id in a sharded map, so distinct calls never
//! block each other. Each session sits behind its own async mutex; all
//! turns for one call serialize on it, which makes duplicate or
//! out-of-order webhook deliveries safe (last write wins per turn, and the
//! dialogue engine's stage advance makes a replayed turn a no-op re-ask).
//!
//! Idle sessions are evicted after a TTL by a background sweeper, and
//! finalized sessions are removed eagerly by the server, so memory stays
//! bounded by active-call volume.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use storeline_core::{CallId, CallSession};

pub type SessionHandle = Arc<Mutex<CallSession>>;

pub struct SessionStore {
    inner: DashMap<String, SessionHandle>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { inner: DashMap::new(), ttl }
    }

    /// Returns the session for `call_id`, creating it on first contact.
    /// Creation is idempotent: a concurrent or repeated call for the same
    /// id returns the existing session untouched.
    pub fn get_or_create(&self, call_id: &CallId) -> SessionHandle {
        self.inner
            .entry(call_id.0.clone())
            .or_insert_with(|| Arc::new(Mutex::new(CallSession::new(call_id.clone()))))
            .value()
            .clone()
    }

    pub fn get(&self, call_id: &CallId) -> Option<SessionHandle> {
        self.inner.get(call_id.as_str()).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, call_id: &CallId) {
        self.inner.remove(call_id.as_str());
    }

    pub fn active_count(&self) -> usize {
        self.inner.len()
    }

    /// Drops sessions idle longer than the TTL. A session whose mutex is
    /// currently held has a turn in flight and is kept regardless of its
    /// recorded activity time. Returns the number of evicted sessions.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.inner.len();

        self.inner.retain(|_, handle| match handle.try_lock() {
            Ok(session) => now
                .signed_duration_since(session.last_activity)
                .to_std()
                .map(|idle| idle < self.ttl)
                .unwrap_or(true),
            Err(_) => true,
        });

        before - self.inner.len()
    }
}

/// Spawns the periodic eviction sweep for the store.
pub fn spawn_sweeper(store: Arc<SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let evicted = store.evict_expired();
            if evicted > 0 {
                debug!(
                    event_name = "sessions.evicted",
                    evicted,
                    remaining = store.active_count(),
                    "idle sessions evicted"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use storeline_core::{CallId, Stage};

    use super::SessionStore;

    fn call(id: &str) -> CallId {
        CallId(id.to_string())
    }

    #[tokio::test]
    async fn creation_is_idempotent_and_preserves_state() {
        let store = SessionStore::new(Duration::from_secs(900));

        {
            let handle = store.get_or_create(&call("CA-1"));
            let mut session = handle.lock().await;
            session.stage = Stage::OrderCapture;
            session.record_customer_name("Asha");
        }

        let handle = store.get_or_create(&call("CA-1"));
        let session = handle.lock().await;
        assert_eq!(session.stage, Stage::OrderCapture);
        assert_eq!(session.customer_name.as_deref(), Some("Asha"));
        assert_eq!(store.active_count(), 1);
    }

    #[tokio::test]
    async fn distinct_calls_get_independent_sessions() {
        let store = SessionStore::new(Duration::from_secs(900));

        let first = store.get_or_create(&call("CA-1"));
        let second = store.get_or_create(&call("CA-2"));

        // Holding one session's lock must not affect the other call.
        let _held = first.lock().await;
        let other = second.try_lock();
        assert!(other.is_ok());
        assert_eq!(store.active_count(), 2);
    }

    #[tokio::test]
    async fn removal_clears_the_session() {
        let store = SessionStore::new(Duration::from_secs(900));
        store.get_or_create(&call("CA-1"));

        store.remove(&call("CA-1"));

        assert!(store.get(&call("CA-1")).is_none());
        assert_eq!(store.active_count(), 0);
    }

    #[tokio::test]
    async fn sweep_evicts_idle_sessions_and_keeps_active_ones() {
        let store = SessionStore::new(Duration::from_secs(60));

        {
            let stale = store.get_or_create(&call("CA-stale"));
            let mut session = stale.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::seconds(120);
        }
        {
            let fresh = store.get_or_create(&call("CA-fresh"));
            fresh.lock().await.touch();
        }

        let evicted = store.evict_expired();

        assert_eq!(evicted, 1);
        assert!(store.get(&call("CA-stale")).is_none());
        assert!(store.get(&call("CA-fresh")).is_some());
    }

    #[tokio::test]
    async fn sweep_skips_sessions_with_a_turn_in_flight() {
        let store = Arc::new(SessionStore::new(Duration::from_secs(60)));

        let handle = store.get_or_create(&call("CA-busy"));
        {
            let mut session = handle.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::seconds(120);
        }

        let guard = handle.lock().await;
        assert_eq!(store.evict_expired(), 0);
        drop(guard);

        assert_eq!(store.evict_expired(), 1);
    }
}
