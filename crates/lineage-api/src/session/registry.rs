use super::Session;
use crate::protocol::message::ServerMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Live sessions keyed by id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an idle session writing to `outbound`
    pub async fn create(&self, outbound: mpsc::Sender<ServerMessage>) -> Arc<Session> {
        let session = Arc::new(Session::new(outbound));
        self.sessions
            .write()
            .await
            .insert(session.id().to_string(), Arc::clone(&session));
        tracing::info!(session_id = %session.id(), "Session opened");
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop the session and stop whatever it was running
    pub async fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.write().await.remove(id)?;
        session.close().await;
        tracing::info!(
            session_id = %id,
            lifetime_ms = (chrono::Utc::now() - session.created_at()).num_milliseconds(),
            "Session closed"
        );
        Some(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_lookup_remove() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = mpsc::channel(4);

        let session = registry.create(tx).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(session.id()).await.is_some());

        let removed = registry.remove(session.id()).await.unwrap();
        assert!(!removed.is_active());
        assert!(registry.is_empty().await);
        assert!(registry.remove(session.id()).await.is_none());
    }
}
