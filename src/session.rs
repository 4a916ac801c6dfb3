//! The session's durable token state and its transitions.
//!
//! All writes to the token fields go through this module; middleware and
//! route handlers never mutate fields ad hoc. Two access tokens (internal
//! and public scope) are refreshed together and share one absolute expiry.

use serde::{Deserialize, Serialize};

use crate::oauth::TokenResponse;
use crate::types::ClientId;

/// One browser session's durable OAuth2 state.
///
/// Created empty at session start, populated by the authorization-code
/// callback, mutated in place on every refresh, and revoked (refresh token
/// nulled) when the provider rejects a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// OAuth2 client this session authenticates as. `None` means the
    /// deployment's default app.
    #[serde(default)]
    pub client_id: Option<ClientId>,
    /// Confidential secret, present only when the session's owner knows it.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Broad-scope bearer token (server-side use only).
    #[serde(default)]
    pub internal_token: Option<String>,
    /// Narrow-scope bearer token (safe for the browser-side viewer).
    #[serde(default)]
    pub public_token: Option<String>,
    /// Refresh token shared by both access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute expiry of the token pair, epoch milliseconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// A bearer token plus its remaining lifetime, derived on demand.
///
/// The internal and public pair of one session always report the same
/// `expires_in` because they share one stored expiry.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    /// Remaining whole seconds, rounded. `<= 0` means already expired.
    pub expires_in: i64,
}

/// Current time as epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

impl Session {
    /// Create a session carrying its own credentials.
    #[must_use]
    pub fn with_credentials(client_id: ClientId, client_secret: Option<String>) -> Self {
        Self {
            client_id: Some(client_id),
            client_secret,
            ..Self::default()
        }
    }

    /// Whether the stored token pair needs a refresh at `now_ms`.
    ///
    /// Tokens are refreshed lazily: a pair is stale once its expiry is no
    /// longer in the future, with no safety margin.
    #[must_use]
    pub fn needs_refresh(&self, now_ms: i64) -> bool {
        self.expires_at.is_none_or(|at| at <= now_ms)
    }

    /// Write a successful internal + public grant pair into the session.
    ///
    /// The refresh token kept is the public grant's (the latest in the
    /// family); expiry comes from the internal grant.
    pub fn apply_grant(&mut self, internal: &TokenResponse, public: &TokenResponse, now_ms: i64) {
        self.internal_token = Some(internal.access_token.clone());
        self.public_token = Some(public.access_token.clone());
        self.refresh_token = public.refresh_token.clone();
        self.expires_at = Some(now_ms + internal.expires_in.unwrap_or(0) as i64 * 1000);
    }

    /// Clear the refresh token after an irrecoverable refresh failure,
    /// forcing re-login. Access tokens are left in place; they are already
    /// expired when this is reached.
    pub fn revoke(&mut self) {
        self.refresh_token = None;
    }

    /// Remaining token lifetime at `now_ms`, in rounded whole seconds.
    #[must_use]
    pub fn remaining_seconds(&self, now_ms: i64) -> i64 {
        let expires_at = self.expires_at.unwrap_or(now_ms);
        ((expires_at - now_ms) as f64 / 1000.0).round() as i64
    }

    /// Internal-scope token pair, if the session holds one.
    #[must_use]
    pub fn internal_token_pair(&self, now_ms: i64) -> Option<TokenPair> {
        self.internal_token.as_ref().map(|token| TokenPair {
            access_token: token.clone(),
            expires_in: self.remaining_seconds(now_ms),
        })
    }

    /// Public-scope token pair, if the session holds one.
    #[must_use]
    pub fn public_token_pair(&self, now_ms: i64) -> Option<TokenPair> {
        self.public_token.as_ref().map(|token| TokenPair {
            access_token: token.clone(),
            expires_in: self.remaining_seconds(now_ms),
        })
    }
}
