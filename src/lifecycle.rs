//! The session's token state machine.
//!
//! States: anonymous (no refresh token) → authenticated → expired-but-
//! refreshable → revoked (refresh failed, refresh token nulled). All
//! transitions run through [`TokenLifecycleManager`]; nothing else touches
//! the session's token fields.

use crate::error::Error;
use crate::factory::ClientFactory;
use crate::oauth::AuthorizationFlows;
use crate::session::{Session, now_ms};

/// Authentication failure taxonomy.
///
/// `NoIdentity`, `NoRefreshToken` and `RefreshRejected` all surface as the
/// same unauthenticated outcome at the HTTP boundary; only `RefreshRejected`
/// additionally clears the session's refresh token.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TokenError {
    /// Session presents no usable client id/secret pair at all.
    #[error("no usable client credentials")]
    NoIdentity,
    /// Session was never authenticated via the user-login flow, or has
    /// already been revoked.
    #[error("session has no refresh token")]
    NoRefreshToken,
    /// The provider refused a refresh attempt; the session is revoked.
    #[error("token refresh rejected by provider")]
    RefreshRejected(#[source] Error),
    /// No secret is resolvable for a 2-legged acquisition. Detected
    /// locally, before any provider round trip.
    #[error("no client secret available for two-legged authentication")]
    NoClientSecret,
    /// The client-credentials exchange itself failed.
    #[error("client credentials acquisition failed")]
    TwoLeggedRejected(#[source] Error),
    /// Any other provider failure (code exchange, profile lookup), passed
    /// through for the route layer to format.
    #[error(transparent)]
    Provider(#[from] Error),
}

/// Owns the token transitions of a [`Session`].
///
/// One manager per deployment; it carries no per-session state. Refreshes
/// are lazy and request-driven — there is no background timer, and no
/// per-session lock: two racing requests may both refresh, the provider
/// issues two valid pairs, and the session store keeps the last write.
pub struct TokenLifecycleManager<F> {
    factory: F,
}

impl<F: ClientFactory> TokenLifecycleManager<F> {
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// The client factory this manager builds provider clients from.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Exchange an authorization code and populate the session.
    ///
    /// The internal-scope client performs the code exchange; the resulting
    /// grant is immediately refreshed through the public-scope client to
    /// mint the narrower viewer token from the same refresh-token family.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Provider`] when either provider call fails or
    /// the grant carries no refresh token. The session is left untouched on
    /// failure.
    pub async fn exchange_code(&self, session: &mut Session, code: &str) -> Result<(), TokenError> {
        let internal = self.factory.internal_client(session);
        let public = self.factory.public_client(session);

        let internal_grant = internal.exchange_code(code).await?;
        let refresh_token = internal_grant.refresh_token.clone().ok_or_else(|| {
            Error::OAuth {
                operation: "token exchange",
                status: None,
                detail: "grant carried no refresh token".into(),
            }
        })?;
        let public_grant = public.refresh_token(&refresh_token).await?;

        session.apply_grant(&internal_grant, &public_grant, now_ms());
        tracing::debug!(client_id = ?session.client_id, "authorization code exchanged");
        Ok(())
    }

    /// Refresh the session's token pair if it is stale.
    ///
    /// Returns `Ok(true)` when a refresh happened (the caller should persist
    /// the session) and `Ok(false)` when the stored pair is still fresh —
    /// in that case no provider call is made and the session is unchanged.
    ///
    /// # Errors
    ///
    /// [`TokenError::NoRefreshToken`] when the session was never
    /// authenticated or is already revoked; [`TokenError::RefreshRejected`]
    /// when the provider refuses, in which case the refresh token is
    /// cleared so subsequent calls fail locally without another doomed
    /// round trip.
    pub async fn refresh_if_needed(&self, session: &mut Session) -> Result<bool, TokenError> {
        let Some(refresh_token) = session.refresh_token.clone() else {
            return Err(TokenError::NoRefreshToken);
        };
        if !session.needs_refresh(now_ms()) {
            return Ok(false);
        }

        let internal = self.factory.internal_client(session);
        let public = self.factory.public_client(session);

        let internal_grant = match internal.refresh_token(&refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(error = %e, "internal token refresh rejected, revoking session");
                session.revoke();
                return Err(TokenError::RefreshRejected(e));
            }
        };
        let next_refresh = internal_grant
            .refresh_token
            .clone()
            .unwrap_or(refresh_token);
        let public_grant = match public.refresh_token(&next_refresh).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(error = %e, "public token refresh rejected, revoking session");
                session.revoke();
                return Err(TokenError::RefreshRejected(e));
            }
        };

        session.apply_grant(&internal_grant, &public_grant, now_ms());
        Ok(true)
    }

    /// Acquire a per-call 2-legged access token.
    ///
    /// Never touches session state: 2-legged tokens are cheap to re-acquire
    /// and scoped to one outgoing request.
    ///
    /// # Errors
    ///
    /// [`TokenError::NoClientSecret`] when no secret is resolvable under
    /// the elevation rules (fails fast, no provider call);
    /// [`TokenError::TwoLeggedRejected`] when the provider refuses.
    pub async fn acquire_two_legged(
        &self,
        session: &Session,
        enable_admin_rights: bool,
    ) -> Result<String, TokenError> {
        let Some(client) = self.factory.two_legged_client(session, enable_admin_rights) else {
            return Err(TokenError::NoClientSecret);
        };
        let grant = client
            .client_credentials()
            .await
            .map_err(TokenError::TwoLeggedRejected)?;
        Ok(grant.access_token)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::error::Error;
    use crate::factory::{
        ClientFactory, DefaultApp, effective_client_id, resolve_secret,
        resolve_two_legged_secret,
    };
    use crate::oauth::{AuthorizationFlows, Profile, ProfileLookup, TokenResponse};
    use crate::registry::ClientCredentialRegistry;
    use crate::session::Session;

    fn grant(access: String, refresh: Option<String>) -> TokenResponse {
        serde_json::from_value(serde_json::json!({
            "access_token": access,
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": refresh,
        }))
        .unwrap()
    }

    fn rejected(operation: &'static str) -> Error {
        Error::OAuth {
            operation,
            status: Some(400),
            detail: "invalid_grant".into(),
        }
    }

    /// Provider client fake that records every call it receives.
    pub(crate) struct MockClient {
        label: &'static str,
        calls: Arc<Mutex<Vec<String>>>,
        seq: Arc<AtomicU64>,
        fail_refresh: bool,
        fail_client_credentials: bool,
    }

    impl MockClient {
        fn record(&self, op: &str) -> u64 {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{}.{op}", self.label));
            self.seq.fetch_add(1, Ordering::SeqCst)
        }
    }

    impl AuthorizationFlows for MockClient {
        fn authorize_url(&self, state: &str) -> String {
            format!("https://mock.example.com/authorize?state={state}")
        }

        async fn exchange_code(&self, _code: &str) -> Result<TokenResponse, Error> {
            let n = self.record("exchange");
            Ok(grant(
                format!("{}-access-{n}", self.label),
                Some(format!("rt-{n}")),
            ))
        }

        async fn refresh_token(&self, _refresh_token: &str) -> Result<TokenResponse, Error> {
            let n = self.record("refresh");
            if self.fail_refresh {
                return Err(rejected("token refresh"));
            }
            Ok(grant(
                format!("{}-access-{n}", self.label),
                Some(format!("rt-{n}")),
            ))
        }

        async fn client_credentials(&self) -> Result<TokenResponse, Error> {
            let n = self.record("client_credentials");
            if self.fail_client_credentials {
                return Err(rejected("client credentials"));
            }
            Ok(grant(format!("app-access-{n}"), None))
        }
    }

    impl ProfileLookup for MockClient {
        async fn get_user_info(&self, _access_token: &str) -> Result<Profile, Error> {
            self.record("userinfo");
            Ok(serde_json::from_value(serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "profileImages": { "sizeX40": "https://img.example.com/40.png" },
            }))
            .unwrap())
        }
    }

    /// [`ClientFactory`] fake sharing the real secret-resolution rules.
    #[derive(Default)]
    pub(crate) struct MockFactory {
        pub(crate) registry: ClientCredentialRegistry,
        pub(crate) default_app: Option<DefaultApp>,
        pub(crate) fail_refresh: bool,
        pub(crate) fail_client_credentials: bool,
        pub(crate) calls: Arc<Mutex<Vec<String>>>,
        pub(crate) seq: Arc<AtomicU64>,
    }

    impl MockFactory {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn client(&self, label: &'static str) -> MockClient {
            MockClient {
                label,
                calls: self.calls.clone(),
                seq: self.seq.clone(),
                fail_refresh: self.fail_refresh,
                fail_client_credentials: self.fail_client_credentials,
            }
        }
    }

    impl ClientFactory for MockFactory {
        type Client = MockClient;

        fn internal_client(&self, _session: &Session) -> MockClient {
            self.client("internal")
        }

        fn public_client(&self, _session: &Session) -> MockClient {
            self.client("public")
        }

        fn two_legged_client(
            &self,
            session: &Session,
            enable_admin_rights: bool,
        ) -> Option<MockClient> {
            resolve_two_legged_secret(
                session,
                self.default_app.as_ref(),
                &self.registry,
                enable_admin_rights,
            )?;
            Some(self.client("two_legged"))
        }

        fn has_identity(&self, session: &Session) -> bool {
            effective_client_id(session, self.default_app.as_ref()).is_some()
                && resolve_secret(session, self.default_app.as_ref(), &self.registry).is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockFactory;
    use super::*;
    use crate::registry::ClientCredentialRegistry;
    use crate::types::ClientId;

    fn manager(factory: MockFactory) -> TokenLifecycleManager<MockFactory> {
        TokenLifecycleManager::new(factory)
    }

    fn authenticated_session(expires_at: i64) -> Session {
        Session {
            client_id: Some(ClientId::from("acme")),
            client_secret: Some("s3cr3t".into()),
            internal_token: Some("int-0".into()),
            public_token: Some("pub-0".into()),
            refresh_token: Some("rt-0".into()),
            expires_at: Some(expires_at),
        }
    }

    #[tokio::test]
    async fn fresh_tokens_are_not_refreshed() {
        let manager = manager(MockFactory::new());
        let mut session = authenticated_session(now_ms() + 60_000);
        let before = session.clone();

        let refreshed = manager.refresh_if_needed(&mut session).await.unwrap();

        assert!(!refreshed);
        assert_eq!(session, before, "fresh session must not change");
        assert!(manager.factory().calls().is_empty(), "no provider call expected");
    }

    #[tokio::test]
    async fn stale_tokens_refresh_exactly_once() {
        let manager = manager(MockFactory::new());
        let mut session = authenticated_session(now_ms() - 1000);

        let refreshed = manager.refresh_if_needed(&mut session).await.unwrap();

        assert!(refreshed);
        assert_eq!(
            manager.factory().calls(),
            ["internal.refresh", "public.refresh"]
        );
        assert!(session.expires_at.unwrap() > now_ms() - 1000);
        assert_ne!(session.internal_token.as_deref(), Some("int-0"));
        assert_ne!(session.public_token.as_deref(), Some("pub-0"));
        assert_ne!(session.refresh_token.as_deref(), Some("rt-0"));
    }

    #[tokio::test]
    async fn rejected_refresh_revokes_and_fails_idempotently() {
        let factory = MockFactory {
            fail_refresh: true,
            ..MockFactory::new()
        };
        let manager = manager(factory);
        let mut session = authenticated_session(now_ms() - 1000);

        let err = manager.refresh_if_needed(&mut session).await.unwrap_err();
        assert!(matches!(err, TokenError::RefreshRejected(_)));
        assert!(session.refresh_token.is_none(), "revocation clears the refresh token");
        assert_eq!(manager.factory().calls(), ["internal.refresh"]);

        // Second attempt fails the same way with zero additional provider calls.
        let err = manager.refresh_if_needed(&mut session).await.unwrap_err();
        assert!(matches!(err, TokenError::NoRefreshToken));
        assert_eq!(manager.factory().calls().len(), 1);
    }

    #[tokio::test]
    async fn exchange_code_then_immediate_refresh_is_noop() {
        let manager = manager(MockFactory::new());
        let mut session =
            Session::with_credentials(ClientId::from("acme"), Some("s3cr3t".into()));

        manager.exchange_code(&mut session, "the-code").await.unwrap();

        assert!(session.internal_token.is_some());
        assert!(session.public_token.is_some());
        assert!(session.refresh_token.is_some());
        assert!(session.expires_at.unwrap() > now_ms());
        assert_eq!(
            manager.factory().calls(),
            ["internal.exchange", "public.refresh"]
        );

        let refreshed = manager.refresh_if_needed(&mut session).await.unwrap();
        assert!(!refreshed);
        assert_eq!(manager.factory().calls().len(), 2, "no further provider calls");
    }

    #[tokio::test]
    async fn two_legged_elevation_is_explicit() {
        let registry = ClientCredentialRegistry::new();
        registry.register(ClientId::from("acme"), "s3cr3t");
        let factory = MockFactory {
            registry,
            ..MockFactory::new()
        };
        let manager = manager(factory);
        let session = Session::with_credentials(ClientId::from("acme"), None);

        let err = manager.acquire_two_legged(&session, false).await.unwrap_err();
        assert!(matches!(err, TokenError::NoClientSecret));
        assert!(
            manager.factory().calls().is_empty(),
            "must fail locally, without a provider round trip"
        );

        let token = manager.acquire_two_legged(&session, true).await.unwrap();
        assert!(token.starts_with("app-access-"));
        assert_eq!(manager.factory().calls(), ["two_legged.client_credentials"]);
    }

    #[tokio::test]
    async fn two_legged_never_mutates_the_session() {
        let manager = manager(MockFactory::new());
        let session = authenticated_session(now_ms() + 60_000);
        let before = session.clone();

        manager.acquire_two_legged(&session, false).await.unwrap();
        assert_eq!(session, before);
    }

    #[tokio::test]
    async fn two_legged_provider_rejection_is_surfaced() {
        let factory = MockFactory {
            fail_client_credentials: true,
            ..MockFactory::new()
        };
        let manager = manager(factory);
        let session = authenticated_session(now_ms() + 60_000);

        let err = manager.acquire_two_legged(&session, false).await.unwrap_err();
        assert!(matches!(err, TokenError::TwoLeggedRejected(_)));
    }
}
