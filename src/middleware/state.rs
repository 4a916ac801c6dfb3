use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{ApsAuthConfig, AuthSettings};
use super::error::AuthError;
use super::extractor::{AppToken, UserTokens};
use super::traits::SessionStore;
use crate::factory::{ApsClientFactory, ClientFactory};
use crate::lifecycle::{TokenError, TokenLifecycleManager};
use crate::registry::ClientCredentialRegistry;
use crate::session::{Session, now_ms};
use crate::types::SessionId;

/// Shared state for the auth routes, the session gate and the extractors.
pub struct AuthState<S, F = ApsClientFactory> {
    pub(super) lifecycle: Arc<TokenLifecycleManager<F>>,
    pub(super) session_store: Arc<S>,
    pub(super) registry: ClientCredentialRegistry,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding `S: Clone, F: Clone` bounds.
impl<S, F> Clone for AuthState<S, F> {
    fn clone(&self) -> Self {
        Self {
            lifecycle: self.lifecycle.clone(),
            session_store: self.session_store.clone(),
            registry: self.registry.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<S, F> FromRef<AuthState<S, F>> for Key {
    fn from_ref(state: &AuthState<S, F>) -> Self {
        state.settings.cookie_key.clone()
    }
}

impl<S: SessionStore> AuthState<S> {
    /// Build state with a fresh, private credential registry.
    #[must_use]
    pub fn new(config: ApsAuthConfig, session_store: S) -> Self {
        Self::with_registry(config, session_store, ClientCredentialRegistry::new())
    }

    /// Build state around an externally owned registry (shared with other
    /// parts of the deployment).
    #[must_use]
    pub fn with_registry(
        config: ApsAuthConfig,
        session_store: S,
        registry: ClientCredentialRegistry,
    ) -> Self {
        let mut factory = ApsClientFactory::new(
            config.provider,
            config.redirect_uri,
            config.scopes,
            registry.clone(),
        );
        if let Some((client_id, client_secret)) = config.default_app {
            factory = factory.with_default_app(client_id, client_secret);
        }
        Self::from_parts(
            TokenLifecycleManager::new(factory),
            session_store,
            registry,
            config.settings,
        )
    }
}

impl<S: SessionStore, F: ClientFactory> AuthState<S, F> {
    pub(crate) fn from_parts(
        lifecycle: TokenLifecycleManager<F>,
        session_store: S,
        registry: ClientCredentialRegistry,
        settings: AuthSettings,
    ) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            session_store: Arc::new(session_store),
            registry,
            settings,
        }
    }

    /// The credential registry used for multi-tenant secret resolution.
    #[must_use]
    pub fn registry(&self) -> &ClientCredentialRegistry {
        &self.registry
    }

    pub(super) async fn load_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Session>, AuthError> {
        self.session_store
            .load(session_id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    pub(super) async fn save_session(
        &self,
        session_id: &SessionId,
        session: Session,
    ) -> Result<(), AuthError> {
        self.session_store
            .save(session_id, session)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    /// Session gate for user-scoped (3-legged) operations.
    ///
    /// Check order matters: identity first, then the refresh-token
    /// requirement, then the lazy refresh. A refresh rejection persists the
    /// revoked session before failing, so later requests fail locally.
    pub(super) async fn user_tokens(
        &self,
        session_id: &SessionId,
    ) -> Result<UserTokens, AuthError> {
        let mut session = self
            .load_session(session_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !self.lifecycle.factory().has_identity(&session) {
            return Err(AuthError::NoIdentity);
        }
        if session.refresh_token.is_none() {
            return Err(AuthError::NoRefreshToken);
        }

        match self.lifecycle.refresh_if_needed(&mut session).await {
            Ok(true) => self.save_session(session_id, session.clone()).await?,
            Ok(false) => {}
            Err(e @ TokenError::RefreshRejected(_)) => {
                self.save_session(session_id, session).await?;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }

        let now = now_ms();
        let internal = session
            .internal_token_pair(now)
            .ok_or(AuthError::Unauthenticated)?;
        let public = session
            .public_token_pair(now)
            .ok_or(AuthError::Unauthenticated)?;
        Ok(UserTokens { internal, public })
    }

    /// Session gate for app-scoped (2-legged only) operation classes.
    ///
    /// This is the reduced-privilege bypass: it never demands a logged-in
    /// user, only a resolvable identity. `enable_admin_rights` permits
    /// falling back to a registry-held secret.
    pub(super) async fn app_token(
        &self,
        session_id: Option<&SessionId>,
        enable_admin_rights: bool,
    ) -> Result<AppToken, AuthError> {
        let session = match session_id {
            Some(id) => self.load_session(id).await?.unwrap_or_default(),
            None => Session::default(),
        };

        if !self.lifecycle.factory().has_identity(&session) {
            return Err(AuthError::NoIdentity);
        }

        let access_token = self
            .lifecycle
            .acquire_two_legged(&session, enable_admin_rights)
            .await?;
        Ok(AppToken { access_token })
    }
}
