use crate::dialogue::DialogueState;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-user conversation state. Created on first contact, mutated every turn,
/// lives for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub state: DialogueState,
    /// Product the user is currently looking at, if any.
    pub product_id: Option<String>,
}

/// Concurrent map of user id → session, with per-user isolation.
///
/// Each session sits behind its own async mutex: holding it for the length of
/// a turn serializes turns from the same user while turns from different
/// users proceed in parallel.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session cell for a user, creating the default
    /// `{ ShowMenu, no product }` state on first touch.
    pub fn get(&self, user_id: &str) -> Arc<Mutex<SessionState>> {
        self.sessions
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_touch_creates_default_state() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let cell = store.get("user-1");
        let session = cell.lock().await;
        assert_eq!(session.state, DialogueState::ShowMenu);
        assert_eq!(session.product_id, None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn mutations_persist_across_lookups() {
        let store = SessionStore::new();
        {
            let cell = store.get("user-1");
            let mut session = cell.lock().await;
            session.state = DialogueState::HandleCart;
            session.product_id = Some("fish-42".into());
        }

        let cell = store.get("user-1");
        let session = cell.lock().await;
        assert_eq!(session.state, DialogueState::HandleCart);
        assert_eq!(session.product_id.as_deref(), Some("fish-42"));
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = SessionStore::new();
        {
            let cell = store.get("alice");
            cell.lock().await.state = DialogueState::WaitingEmail;
        }

        let cell = store.get("bob");
        let session = cell.lock().await;
        assert_eq!(session.state, DialogueState::ShowMenu);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn one_user_locked_does_not_block_another() {
        let store = SessionStore::new();
        let alice = store.get("alice");
        let _held = alice.lock().await;

        // Bob's session must be acquirable while Alice's turn is in flight.
        let bob = store.get("bob");
        let acquired =
            tokio::time::timeout(std::time::Duration::from_millis(50), bob.lock()).await;
        assert!(acquired.is_ok());
    }
}
