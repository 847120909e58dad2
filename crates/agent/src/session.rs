//! Concurrent per-call session store. One session per live call id;
//! turns for the same call serialize on the session's own lock while
//! distinct calls proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};

use tably_core::domain::session::{CallId, Session};

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Returns the session for the call, creating one on first contact.
    /// The boolean reports whether this call was new. A caller-id phone
    /// pre-fills the contact phone so the flow can skip asking for it.
    pub async fn acquire(
        &self,
        call_id: &CallId,
        caller_phone: Option<&str>,
    ) -> (SessionHandle, bool) {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(&call_id.0) {
                return (handle.clone(), false);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Racing acquirers settle on whichever insert won.
        if let Some(handle) = sessions.get(&call_id.0) {
            return (handle.clone(), false);
        }

        let mut session = Session::new(call_id.clone());
        if let Some(phone) = caller_phone {
            let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
            if digits.len() >= 7 {
                session.customer.phone = Some(digits);
            }
        }
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(call_id.0.clone(), handle.clone());
        (handle, true)
    }

    pub async fn get(&self, call_id: &CallId) -> Option<SessionHandle> {
        self.sessions.read().await.get(&call_id.0).cloned()
    }

    pub async fn remove(&self, call_id: &CallId) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&call_id.0)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drops sessions idle past the window and returns their call ids.
    /// A session whose lock is held is mid-turn and is left alone.
    pub async fn evict_idle(&self, now: DateTime<Utc>, idle_window: Duration) -> Vec<CallId> {
        let mut sessions = self.sessions.write().await;
        let mut evicted = Vec::new();

        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => {
                if session.is_idle(now, idle_window) {
                    evicted.push(session.call_id.clone());
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });

        evicted
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use tably_core::domain::session::CallId;

    use super::SessionStore;

    #[tokio::test]
    async fn first_contact_creates_and_later_turns_reuse() {
        let store = SessionStore::default();
        let call = CallId("CA-1".to_string());

        let (first, created) = store.acquire(&call, None).await;
        assert!(created);
        let (second, created_again) = store.acquire(&call, None).await;
        assert!(!created_again);
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn caller_id_prefills_the_contact_phone() {
        let store = SessionStore::default();
        let (handle, _) = store.acquire(&CallId("CA-1".to_string()), Some("+1 (555) 123-4567")).await;
        let session = handle.lock().await;
        assert_eq!(session.customer.phone.as_deref(), Some("15551234567"));
        assert!(session.customer.name.is_none());
    }

    #[tokio::test]
    async fn distinct_calls_never_share_state() {
        let store = SessionStore::default();
        let (first, _) = store.acquire(&CallId("CA-1".to_string()), None).await;
        let (second, _) = store.acquire(&CallId("CA-2".to_string()), None).await;

        first.lock().await.customer.name = Some("Ada".to_string());
        assert!(second.lock().await.customer.name.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_and_busy_ones_kept() {
        let store = SessionStore::default();
        let idle_call = CallId("CA-idle".to_string());
        let busy_call = CallId("CA-busy".to_string());

        let (idle, _) = store.acquire(&idle_call, None).await;
        let (busy, _) = store.acquire(&busy_call, None).await;
        idle.lock().await.updated_at = Utc::now() - Duration::seconds(700);
        busy.lock().await.updated_at = Utc::now() - Duration::seconds(700);

        let _mid_turn = busy.lock().await;
        let evicted = store.evict_idle(Utc::now(), Duration::seconds(600)).await;

        assert_eq!(evicted, vec![idle_call]);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&busy_call).await.is_some());
    }
}
