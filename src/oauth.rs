use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// APS identity provider endpoints.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors. Endpoints default to the public APS v2 authentication service.
///
/// ```rust,ignore
/// use aps_session_auth::ProviderConfig;
///
/// let provider = ProviderConfig::default()
///     .with_token_url("https://custom.example.com/token".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    pub(crate) authorize_url: Url,
    pub(crate) token_url: Url,
    pub(crate) userinfo_url: Url,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authorize_url: "https://developer.api.autodesk.com/authentication/v2/authorize"
                .parse()
                .expect("valid default URL"),
            token_url: "https://developer.api.autodesk.com/authentication/v2/token"
                .parse()
                .expect("valid default URL"),
            userinfo_url: "https://developer.api.autodesk.com/userprofile/v1/users/@me"
                .parse()
                .expect("valid default URL"),
        }
    }
}

impl ProviderConfig {
    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_authorize_url(mut self, url: Url) -> Self {
        self.authorize_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the user profile endpoint.
    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }

    /// Token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// User profile endpoint URL.
    #[must_use]
    pub fn userinfo_url(&self) -> &Url {
        &self.userinfo_url
    }
}

/// Token response from the APS token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// User display profile from the APS profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    /// Image URLs keyed by size (`sizeX40`, `sizeX80`, ...).
    #[serde(default)]
    pub profile_images: HashMap<String, String>,
}

/// The OAuth2 grant operations a provider client exposes.
///
/// A client is bound to one `(client_id, secret, redirect_uri, scopes)`
/// tuple at construction; no call takes credentials or scopes. The token
/// lifecycle stays provider-agnostic through this trait, and tests swap in
/// counting fakes.
pub trait AuthorizationFlows: Send + Sync {
    /// Build the authorization redirect URL for the bound client and scopes.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a token grant.
    fn exchange_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;

    /// Refresh a grant. The bound scopes are sent with the request, so a
    /// narrower-scoped client mints a narrower token from the same family.
    fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;

    /// Client-credentials (2-legged) acquisition for the bound client.
    fn client_credentials(&self) -> impl Future<Output = Result<TokenResponse, Error>> + Send;
}

/// Exchange of a valid access token for a user display profile.
pub trait ProfileLookup: Send + Sync {
    /// Fetch the profile of the user the token belongs to.
    ///
    /// Provider errors are surfaced unchanged.
    fn get_user_info(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Profile, Error>> + Send;
}

/// Concrete APS provider client.
///
/// One instance per (credentials, scope set) binding; constructions are
/// cheap and perform no I/O.
pub struct AuthClient {
    provider: ProviderConfig,
    client_id: String,
    client_secret: String,
    redirect_uri: Url,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl AuthClient {
    /// Create a client bound to one credential/scope tuple.
    ///
    /// An empty `client_secret` yields a public-client request (no Basic
    /// auth header); APS rejects such requests for confidential flows.
    #[must_use]
    pub fn new(
        provider: ProviderConfig,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            scopes,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Bound client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the client carries a confidential secret.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        !self.client_secret.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    fn token_request(&self, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        let request = self.http.post(self.provider.token_url.clone()).form(params);
        if self.client_secret.is_empty() {
            request
        } else {
            request.basic_auth(&self.client_id, Some(&self.client_secret))
        }
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail,
        })
    }
}

impl AuthorizationFlows for AuthClient {
    fn authorize_url(&self, state: &str) -> String {
        let scope = self.scopes.join(" ");

        let mut url = self.provider.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", state);

        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self.token_request(&params).send().await?;
        let response = Self::ensure_success(response, "token exchange").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, Error> {
        let scope = self.scopes.join(" ");
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];

        let response = self.token_request(&params).send().await?;
        let response = Self::ensure_success(response, "token refresh").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }

    async fn client_credentials(&self) -> Result<TokenResponse, Error> {
        let scope = self.scopes.join(" ");
        let params = [
            ("grant_type", "client_credentials"),
            ("scope", scope.as_str()),
        ];

        let response = self.token_request(&params).send().await?;
        let response = Self::ensure_success(response, "client credentials").await?;
        response.json::<TokenResponse>().await.map_err(Into::into)
    }
}

impl ProfileLookup for AuthClient {
    async fn get_user_info(&self, access_token: &str) -> Result<Profile, Error> {
        let response = self
            .http
            .get(self.provider.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "userinfo request").await?;
        response.json::<Profile>().await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scopes::ScopeSet;

    fn test_client(secret: &str) -> AuthClient {
        AuthClient::new(
            ProviderConfig::default(),
            "test-client",
            secret,
            "https://example.com/callback".parse().unwrap(),
            ScopeSet::default().internal,
        )
    }

    #[test]
    fn test_authorize_url_parameters() {
        let client = test_client("s3cr3t");
        let url = client.authorize_url("xyz");

        assert!(url.starts_with("https://developer.api.autodesk.com/authentication/v2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=test-client"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("data%3Aread"));
    }

    #[test]
    fn test_provider_overrides() {
        let provider = ProviderConfig::default()
            .with_token_url("https://custom.example.com/token".parse().unwrap());

        assert_eq!(
            provider.token_url().as_str(),
            "https://custom.example.com/token"
        );
        assert_eq!(
            provider.authorize_url().as_str(),
            "https://developer.api.autodesk.com/authentication/v2/authorize"
        );
    }

    #[test]
    fn test_secret_binding() {
        assert!(test_client("s3cr3t").has_secret());
        assert!(!test_client("").has_secret());
    }

    #[test]
    fn profile_deserializes_provider_shape() {
        let json = r#"{
            "firstName": "Ada",
            "lastName": "Lovelace",
            "profileImages": { "sizeX40": "https://img.example.com/40.png" }
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.last_name, "Lovelace");
        assert_eq!(
            profile.profile_images.get("sizeX40").map(String::as_str),
            Some("https://img.example.com/40.png")
        );
    }
}
