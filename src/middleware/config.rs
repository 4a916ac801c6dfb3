use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::oauth::ProviderConfig;
use crate::scopes::ScopeSet;
use crate::types::ClientId;

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
}

impl AuthSettings {
    pub(crate) fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__aps_session".into(),
            session_ttl_days: 30,
            secure_cookies: true,
            auth_path: "/api/auth".into(),
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
            error_redirect: "/".into(),
        }
    }
}

/// APS authentication configuration.
///
/// Required field (`redirect_uri`) is a constructor parameter — no runtime
/// "missing field" errors.
///
/// Use [`from_env()`](ApsAuthConfig::from_env) for convention-based setup,
/// or [`new()`](ApsAuthConfig::new) with `with_*` methods for full control.
pub struct ApsAuthConfig {
    pub(super) provider: ProviderConfig,
    pub(super) redirect_uri: Url,
    pub(super) scopes: ScopeSet,
    pub(super) default_app: Option<(ClientId, String)>,
    pub(super) settings: AuthSettings,
}

impl ApsAuthConfig {
    /// Create config with the required OAuth2 redirect URI.
    ///
    /// All optional fields use sensible defaults. Override with `with_*`
    /// methods.
    #[must_use]
    pub fn new(redirect_uri: Url) -> Self {
        Self {
            provider: ProviderConfig::default(),
            redirect_uri,
            scopes: ScopeSet::default(),
            default_app: None,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `APS_CALLBACK_URL`: OAuth2 callback URI (must be a valid URL)
    /// - `SERVER_SESSION_SECRET`: Session cookie encryption key bytes
    ///
    /// # Optional env vars
    /// - `APS_CLIENT_ID` / `APS_CLIENT_SECRET`: deployment-default app,
    ///   used by sessions that bring no credentials of their own (both or
    ///   neither must be set)
    /// - `APS_AUTH_URL` / `APS_TOKEN_URL` / `APS_USERINFO_URL`: endpoint
    ///   overrides
    /// - `APS_INTERNAL_SCOPES` / `APS_PUBLIC_SCOPES`: comma-separated scope
    ///   overrides
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or
    /// values are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let redirect_uri_str = std::env::var("APS_CALLBACK_URL")
            .map_err(|_| AuthError::Config("APS_CALLBACK_URL is required".into()))?;
        let redirect_uri: Url = redirect_uri_str
            .parse()
            .map_err(|e| AuthError::Config(format!("APS_CALLBACK_URL: {e}")))?;

        let session_secret = std::env::var("SERVER_SESSION_SECRET")
            .map_err(|_| AuthError::Config("SERVER_SESSION_SECRET is required".into()))?;
        let cookie_key = Key::try_from(session_secret.as_bytes()).map_err(|_| {
            AuthError::Config(
                "SERVER_SESSION_SECRET is invalid (must be at least 64 bytes)".into(),
            )
        })?;

        let mut config = Self::new(redirect_uri).with_cookie_key(cookie_key);

        match (
            std::env::var("APS_CLIENT_ID"),
            std::env::var("APS_CLIENT_SECRET"),
        ) {
            (Ok(id), Ok(secret)) => {
                config = config.with_default_app(ClientId::from(id), secret);
            }
            (Err(_), Err(_)) => {}
            _ => {
                return Err(AuthError::Config(
                    "APS_CLIENT_ID and APS_CLIENT_SECRET must be set together".into(),
                ));
            }
        }

        let mut provider = ProviderConfig::default();
        if let Ok(url_str) = std::env::var("APS_AUTH_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("APS_AUTH_URL: {e}")))?;
            provider = provider.with_authorize_url(url);
        }
        if let Ok(url_str) = std::env::var("APS_TOKEN_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("APS_TOKEN_URL: {e}")))?;
            provider = provider.with_token_url(url);
        }
        if let Ok(url_str) = std::env::var("APS_USERINFO_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("APS_USERINFO_URL: {e}")))?;
            provider = provider.with_userinfo_url(url);
        }
        config = config.with_provider(provider);

        let mut scopes = ScopeSet::default();
        if let Ok(internal) = std::env::var("APS_INTERNAL_SCOPES") {
            scopes.internal = internal.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(public) = std::env::var("APS_PUBLIC_SCOPES") {
            scopes.public = public.split(',').map(|s| s.trim().to_string()).collect();
        }
        config = config.with_scopes(scopes);

        Ok(config)
    }

    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: ScopeSet) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set the deployment-default app used by sessions without credentials
    /// of their own.
    #[must_use]
    pub fn with_default_app(mut self, client_id: ClientId, client_secret: impl Into<String>) -> Self {
        self.default_app = Some((client_id, client_secret.into()));
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }
}
