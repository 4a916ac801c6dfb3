use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use ulid::Ulid;

use super::traits::{BoxError, SessionStore};
use crate::session::Session;
use crate::types::SessionId;

/// In-process [`SessionStore`] for tests and single-instance deployments.
///
/// Sessions live in a shared map (clones share state) and are lost on
/// restart, like the credential registry.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: Session) -> Result<SessionId, BoxError> {
        let id = SessionId::from(Ulid::new().to_string());
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(id.clone(), session);
        Ok(id)
    }

    async fn load(&self, session_id: &SessionId) -> Result<Option<Session>, BoxError> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(session_id).cloned())
    }

    async fn save(&self, session_id: &SessionId, session: Session) -> Result<(), BoxError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(session_id.clone(), session);
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), BoxError> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(session_id);
        Ok(())
    }
}
