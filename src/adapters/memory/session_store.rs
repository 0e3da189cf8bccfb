//! In-memory session store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{EntityId, SessionId, UserId};
use crate::domain::session::Session;
use crate::ports::{SessionStore, StoreError};

/// Session store backed by a process-local map.
///
/// Upholds the port's `(user, entity)` uniqueness lookup by scanning for
/// non-terminal sessions; the scan is fine at in-memory scale.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session map poisoned").len()
    }

    /// Returns true if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.lock().expect("session map poisoned");
        Ok(sessions.get(id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions.insert(session.id(), session.clone());
        Ok(())
    }

    async fn find_active_by_user_and_entity(
        &self,
        user_id: &UserId,
        entity_id: &EntityId,
    ) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.lock().expect("session map poisoned");
        Ok(sessions
            .values()
            .find(|s| {
                !s.status().is_terminal()
                    && s.user_id() == Some(user_id)
                    && s.entity_id() == Some(*entity_id)
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("keeper-1").unwrap()
    }

    #[tokio::test]
    async fn load_returns_none_for_unknown_id() {
        let store = InMemorySessionStore::new();
        assert!(store.load(&SessionId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let store = InMemorySessionStore::new();
        let session = Session::new(Some(user()), None);

        store.save(&session).await.unwrap();
        let loaded = store.load(&session.id()).await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn save_replaces_existing_session() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new(Some(user()), None);
        store.save(&session).await.unwrap();

        session.abandon().unwrap();
        store.save(&session).await.unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store.load(&session.id()).await.unwrap().unwrap();
        assert!(loaded.status().is_terminal());
    }

    #[tokio::test]
    async fn find_active_matches_user_and_entity() {
        let store = InMemorySessionStore::new();
        let entity = EntityId::new();
        let session = Session::new(Some(user()), Some(entity));
        store.save(&session).await.unwrap();

        let found = store
            .find_active_by_user_and_entity(&user(), &entity)
            .await
            .unwrap();
        assert_eq!(found.unwrap().id(), session.id());
    }

    #[tokio::test]
    async fn find_active_skips_terminal_sessions() {
        let store = InMemorySessionStore::new();
        let entity = EntityId::new();
        let mut session = Session::new(Some(user()), Some(entity));
        session.abandon().unwrap();
        store.save(&session).await.unwrap();

        let found = store
            .find_active_by_user_and_entity(&user(), &entity)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn find_active_skips_other_users() {
        let store = InMemorySessionStore::new();
        let entity = EntityId::new();
        let session = Session::new(Some(user()), Some(entity));
        store.save(&session).await.unwrap();

        let other = UserId::new("keeper-2").unwrap();
        let found = store
            .find_active_by_user_and_entity(&other, &entity)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
