//! Construction of provider clients bound to one session's credentials.

use url::Url;

use crate::oauth::{AuthClient, AuthorizationFlows, ProfileLookup, ProviderConfig};
use crate::registry::ClientCredentialRegistry;
use crate::scopes::ScopeSet;
use crate::session::Session;
use crate::types::ClientId;

/// Builds the three provider client kinds for a session.
///
/// Implementations must be pure: no network I/O, no mutation of the session
/// or the registry. The trait exists so the token lifecycle (and its tests)
/// never depend on a concrete provider SDK.
pub trait ClientFactory: Send + Sync + 'static {
    type Client: AuthorizationFlows + ProfileLookup + Send + Sync;

    /// Authorization-code client with the broad internal scopes.
    fn internal_client(&self, session: &Session) -> Self::Client;

    /// Authorization-code client with the narrow public scopes.
    fn public_client(&self, session: &Session) -> Self::Client;

    /// Client-credentials (2-legged) client, or `None` when no secret is
    /// resolvable under the requested elevation rules. Returning `None`
    /// lets the caller fail fast instead of sending a request the provider
    /// is certain to reject.
    fn two_legged_client(&self, session: &Session, enable_admin_rights: bool)
    -> Option<Self::Client>;

    /// Whether the session presents any usable identity at all: a client id
    /// (its own or the deployment default) plus a resolvable secret.
    fn has_identity(&self, session: &Session) -> bool;
}

/// Deployment-default app credentials, used by sessions that bring none.
pub(crate) type DefaultApp = (ClientId, String);

/// Client id a session authenticates as.
pub(crate) fn effective_client_id<'a>(
    session: &'a Session,
    default_app: Option<&'a DefaultApp>,
) -> Option<&'a ClientId> {
    session
        .client_id
        .as_ref()
        .or(default_app.map(|(id, _)| id))
}

/// Secret resolution for the authorization-code (3-legged) clients: the
/// session's own secret wins, then the registry's entry for its client id.
pub(crate) fn resolve_secret(
    session: &Session,
    default_app: Option<&DefaultApp>,
    registry: &ClientCredentialRegistry,
) -> Option<String> {
    match &session.client_id {
        Some(id) => session
            .client_secret
            .clone()
            .or_else(|| registry.lookup(id)),
        None => default_app.map(|(_, secret)| secret.clone()),
    }
}

/// Secret resolution for the client-credentials (2-legged) client.
///
/// Deliberately stricter than the 3-legged rule: a registry-held secret is
/// only used when the caller explicitly asked for admin rights. Registry
/// presence alone never grants app-level capability.
pub(crate) fn resolve_two_legged_secret(
    session: &Session,
    default_app: Option<&DefaultApp>,
    registry: &ClientCredentialRegistry,
    enable_admin_rights: bool,
) -> Option<String> {
    match &session.client_id {
        Some(id) => session.client_secret.clone().or_else(|| {
            if enable_admin_rights {
                registry.lookup(id)
            } else {
                None
            }
        }),
        None => default_app.map(|(_, secret)| secret.clone()),
    }
}

/// [`ClientFactory`] for the APS authentication service.
#[derive(Clone)]
pub struct ApsClientFactory {
    provider: ProviderConfig,
    redirect_uri: Url,
    scopes: ScopeSet,
    registry: ClientCredentialRegistry,
    default_app: Option<DefaultApp>,
    http: reqwest::Client,
}

impl ApsClientFactory {
    #[must_use]
    pub fn new(
        provider: ProviderConfig,
        redirect_uri: Url,
        scopes: ScopeSet,
        registry: ClientCredentialRegistry,
    ) -> Self {
        Self {
            provider,
            redirect_uri,
            scopes,
            registry,
            default_app: None,
            http: reqwest::Client::new(),
        }
    }

    /// Set the deployment-default app used by sessions without credentials.
    #[must_use]
    pub fn with_default_app(mut self, client_id: ClientId, client_secret: impl Into<String>) -> Self {
        self.default_app = Some((client_id, client_secret.into()));
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// The registry this factory resolves shared secrets from.
    #[must_use]
    pub fn registry(&self) -> &ClientCredentialRegistry {
        &self.registry
    }

    fn build(&self, session: &Session, secret: Option<String>, scopes: &[String]) -> AuthClient {
        let client_id = effective_client_id(session, self.default_app.as_ref())
            .map(|id| id.as_str().to_owned())
            .unwrap_or_default();
        AuthClient::new(
            self.provider.clone(),
            client_id,
            secret.unwrap_or_default(),
            self.redirect_uri.clone(),
            scopes.to_vec(),
        )
        .with_http_client(self.http.clone())
    }
}

impl ClientFactory for ApsClientFactory {
    type Client = AuthClient;

    fn internal_client(&self, session: &Session) -> AuthClient {
        let secret = resolve_secret(session, self.default_app.as_ref(), &self.registry);
        self.build(session, secret, &self.scopes.internal)
    }

    fn public_client(&self, session: &Session) -> AuthClient {
        let secret = resolve_secret(session, self.default_app.as_ref(), &self.registry);
        self.build(session, secret, &self.scopes.public)
    }

    fn two_legged_client(
        &self,
        session: &Session,
        enable_admin_rights: bool,
    ) -> Option<AuthClient> {
        let secret = resolve_two_legged_secret(
            session,
            self.default_app.as_ref(),
            &self.registry,
            enable_admin_rights,
        )?;
        // 2-legged tokens carry the internal scope set.
        Some(self.build(session, Some(secret), &self.scopes.internal))
    }

    fn has_identity(&self, session: &Session) -> bool {
        effective_client_id(session, self.default_app.as_ref()).is_some()
            && resolve_secret(session, self.default_app.as_ref(), &self.registry).is_some()
    }
}
