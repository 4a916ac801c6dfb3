use std::future::Future;

use crate::session::Session;
use crate::types::SessionId;

/// Boxed error type for consumer-provided stores.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer-provided session persistence.
///
/// The store owns all durable token state; no other component persists
/// tokens. Sessions are identified by opaque [`SessionId`]s — the consumer
/// chooses the format (ULID, UUID, etc.).
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for MyAppState {
///     async fn create(&self, session: Session) -> Result<SessionId, BoxError> {
///         let id = SessionId::from(Ulid::new().to_string());
///         self.db.insert_session(&id, &session).await?;
///         Ok(id)
///     }
///
///     async fn load(&self, id: &SessionId) -> Result<Option<Session>, BoxError> {
///         self.db.find_session(id).await
///     }
///
///     async fn save(&self, id: &SessionId, session: Session) -> Result<(), BoxError> {
///         self.db.upsert_session(id, &session).await
///     }
///
///     async fn delete(&self, id: &SessionId) -> Result<(), BoxError> {
///         self.db.delete_session(id).await
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Persist a new session. Returns its ID.
    fn create(
        &self,
        session: Session,
    ) -> impl Future<Output = Result<SessionId, BoxError>> + Send;

    /// Look up a session by ID.
    fn load(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, BoxError>> + Send;

    /// Overwrite a session's state (token refresh, revocation).
    fn save(
        &self,
        session_id: &SessionId,
        session: Session,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Delete a session (logout).
    fn delete(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}
