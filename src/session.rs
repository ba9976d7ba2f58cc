// src/session.rs
//! Per-conversation state registry.
//!
//! Each conversation owns its own `ConversationState` behind its own mutex:
//! - the registry lock is held only to find / insert / remove a session,
//! - resolution runs under the session mutex, so turns of one conversation are serialized
//!   while different conversations proceed in parallel.
//!
//! Sessions idle longer than the configured TTL are evicted by `evict_idle` (driven by
//! `spawn_sweeper`), and the registry never grows past `max_sessions`: the least recently
//! active conversation makes room for a new one.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::dialogue::ConversationState;
use crate::metrics;

static SESSION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("session id regex"));

/// Client-supplied ids must be short and URL/header safe.
pub fn is_valid_session_id(id: &str) -> bool {
    SESSION_ID_RE.is_match(id)
}

pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug)]
pub struct Session {
    state: Mutex<ConversationState>,
    last_active_ms: AtomicI64,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(ConversationState::new()),
            last_active_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_active_ms
            .fetch_max(now.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.last_active_ms.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ConversationState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Arc<Session>>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(cfg: &SessionConfig) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            idle_ttl: Duration::seconds(cfg.idle_ttl_secs.min(u32::MAX as u64) as i64),
            max_sessions: cfg.max_sessions.max(1),
        }
    }

    /// Run `f` on the state of `requested` (or of a freshly minted session when the id is
    /// absent or malformed). Returns the session id actually used.
    pub fn with_state<R>(
        &self,
        requested: Option<&str>,
        f: impl FnOnce(&mut ConversationState) -> R,
    ) -> (String, R) {
        self.with_state_at(requested, Utc::now(), f)
    }

    pub fn with_state_at<R>(
        &self,
        requested: Option<&str>,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut ConversationState) -> R,
    ) -> (String, R) {
        let (id, session) = self.open(requested, now);
        let out = {
            // A panic in another turn must not lock the conversation forever.
            let mut state = session.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut state)
        };
        session.touch(now);
        (id, out)
    }

    fn open(&self, requested: Option<&str>, now: DateTime<Utc>) -> (String, Arc<Session>) {
        let id = match requested.map(str::trim) {
            Some(id) if is_valid_session_id(id) => id.to_string(),
            Some(bad) => {
                debug!(target: "session", len = bad.len(), "rejected client session id");
                new_session_id()
            }
            None => new_session_id(),
        };

        if let Some(s) = self.read_map().get(&id) {
            return (id, s.clone());
        }

        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have created it meanwhile.
        if let Some(s) = map.get(&id) {
            return (id, s.clone());
        }
        if map.len() >= self.max_sessions {
            evict_oldest(&mut map);
        }
        let session = Arc::new(Session::new(now));
        map.insert(id.clone(), session.clone());
        metrics::set_active_sessions(map.len());
        (id, session)
    }

    /// Forget a conversation. Returns whether it existed.
    pub fn reset(&self, id: &str) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = map.remove(id).is_some();
        metrics::set_active_sessions(map.len());
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.read_map().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.idle_ttl;
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = map.len();
        map.retain(|_, s| s.last_active() > cutoff);
        let evicted = before - map.len();
        metrics::set_active_sessions(map.len());
        if evicted > 0 {
            metrics::record_evictions(evicted);
        }
        evicted
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Session>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn evict_oldest(map: &mut HashMap<String, Arc<Session>>) {
    let oldest = map
        .iter()
        .min_by_key(|(_, s)| s.last_active_ms.load(Ordering::Relaxed))
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        map.remove(&id);
        metrics::record_evictions(1);
        debug!(target: "session", "capacity reached, evicted least recently active session");
    }
}

/// Periodically evict idle sessions on the tokio runtime.
pub fn spawn_sweeper(store: Arc<SessionStore>, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        // first tick completes immediately
        tick.tick().await;
        loop {
            tick.tick().await;
            let evicted = store.evict_idle(Utc::now());
            if evicted > 0 {
                info!(target: "session", evicted, remaining = store.len(), "idle sessions evicted");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl: u64, max: usize) -> SessionStore {
        SessionStore::new(&SessionConfig {
            idle_ttl_secs: ttl,
            sweep_interval_secs: 60,
            max_sessions: max,
        })
    }

    #[test]
    fn id_validation() {
        assert!(is_valid_session_id("abc-123_XYZ"));
        assert!(is_valid_session_id(&new_session_id()));
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("has space"));
        assert!(!is_valid_session_id("semi;colon"));
        assert!(!is_valid_session_id(&"x".repeat(65)));
    }

    #[test]
    fn same_id_shares_state() {
        let s = store(60, 10);
        let (id, _) = s.with_state(Some("conv-1"), |st| {
            st.pending_disease = Some("malaria".into())
        });
        assert_eq!(id, "conv-1");
        let (_, pending) = s.with_state(Some("conv-1"), |st| st.pending_disease.clone());
        assert_eq!(pending.as_deref(), Some("malaria"));

        let (_, other) = s.with_state(Some("conv-2"), |st| st.pending_disease.clone());
        assert_eq!(other, None);
    }

    #[test]
    fn invalid_or_missing_id_gets_fresh_session() {
        let s = store(60, 10);
        let (a, _) = s.with_state(None, |_| ());
        let (b, _) = s.with_state(Some("no spaces allowed"), |_| ());
        assert_ne!(a, b);
        assert!(is_valid_session_id(&a) && is_valid_session_id(&b));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn idle_sessions_expire() {
        let s = store(30, 10);
        let t0 = Utc::now();
        s.with_state_at(Some("old"), t0, |_| ());
        s.with_state_at(Some("fresh"), t0 + Duration::seconds(25), |_| ());

        assert_eq!(s.evict_idle(t0 + Duration::seconds(31)), 1);
        assert!(s.get("old").is_none());
        assert!(s.get("fresh").is_some());
    }

    #[test]
    fn capacity_evicts_least_recently_active() {
        let s = store(600, 2);
        let t0 = Utc::now();
        s.with_state_at(Some("a"), t0, |_| ());
        s.with_state_at(Some("b"), t0 + Duration::seconds(1), |_| ());
        // touch a again, b is now the oldest
        s.with_state_at(Some("a"), t0 + Duration::seconds(2), |_| ());
        s.with_state_at(Some("c"), t0 + Duration::seconds(3), |_| ());

        assert_eq!(s.len(), 2);
        assert!(s.get("a").is_some());
        assert!(s.get("b").is_none());
        assert!(s.get("c").is_some());
    }

    #[test]
    fn reset_forgets_conversation() {
        let s = store(60, 10);
        s.with_state(Some("x"), |st| st.pending_disease = Some("zika".into()));
        assert!(s.reset("x"));
        assert!(!s.reset("x"));
        let (_, pending) = s.with_state(Some("x"), |st| st.pending_disease.clone());
        assert_eq!(pending, None);
    }
}
