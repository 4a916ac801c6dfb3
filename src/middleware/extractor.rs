use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::cookies;
use super::error::AuthError;
use super::state::AuthState;
use super::traits::SessionStore;
use crate::factory::ClientFactory;
use crate::session::TokenPair;

/// Validated user token pair, attached by the session gate.
///
/// Use as an Axum extractor in route handlers for user-scoped (3-legged)
/// operations. Extraction runs the full gate — identity check, refresh-token
/// requirement, lazy refresh — and returns `401 Unauthorized` on any
/// failure, so handlers only ever see valid tokens.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_hubs(tokens: UserTokens) -> impl IntoResponse {
///     // tokens.internal drives server-side data access,
///     // tokens.public is safe to forward to the viewer.
/// }
/// ```
#[derive(Debug, Clone)]
pub struct UserTokens {
    /// Broad-scope pair for server-side data access.
    pub internal: TokenPair,
    /// Narrow-scope pair, safe to hand to the browser-side viewer.
    pub public: TokenPair,
}

/// App-level (2-legged) access token for operation classes that must not
/// require a human login, such as bulk collection/definition listing.
///
/// Extraction resolves the session's identity (or the deployment default)
/// and acquires a fresh client-credentials token per request, elevating
/// through the registry when needed. No session state is touched.
#[derive(Debug, Clone)]
pub struct AppToken {
    pub access_token: String,
}

impl<S: SessionStore, F: ClientFactory> FromRequestParts<AuthState<S, F>> for UserTokens {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<S, F>,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let session_id = cookies::get_session_id(&jar, &state.settings.session_cookie_name)
            .ok_or(AuthError::Unauthenticated)?;

        state.user_tokens(&session_id).await
    }
}

impl<S: SessionStore, F: ClientFactory> FromRequestParts<AuthState<S, F>> for AppToken {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<S, F>,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let session_id = cookies::get_session_id(&jar, &state.settings.session_cookie_name);

        state.app_token(session_id.as_ref(), true).await
    }
}
