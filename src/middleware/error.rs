use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::lifecycle::TokenError;

/// Authentication errors for the middleware layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session cookie, or the session is unknown to the store.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Session presents no usable client id/secret pair.
    #[error("No usable client credentials")]
    NoIdentity,

    /// Session was never authenticated via the user-login flow.
    #[error("Session has no refresh token")]
    NoRefreshToken,

    /// The provider refused a refresh; the session has been revoked.
    #[error("Session refresh rejected")]
    RefreshRejected,

    /// Client-credentials acquisition failed.
    #[error("Two-legged authentication failed: {0}")]
    TwoLegged(String),

    /// Non-authentication provider failure, passed through.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Store(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            // One indistinguishable unauthenticated outcome: the route layer
            // treats "no attached tokens" as the sole failure signal, and
            // clients cannot probe which check failed.
            Self::Unauthenticated
            | Self::NoIdentity
            | Self::NoRefreshToken
            | Self::RefreshRejected
            | Self::TwoLegged(_) => {
                (StatusCode::UNAUTHORIZED, "Not authenticated").into_response()
            }
            Self::Provider(ref msg) => {
                (StatusCode::BAD_GATEWAY, msg.clone()).into_response()
            }
            Self::Store(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::NoIdentity => Self::NoIdentity,
            TokenError::NoRefreshToken => Self::NoRefreshToken,
            TokenError::RefreshRejected(_) => Self::RefreshRejected,
            TokenError::NoClientSecret => {
                Self::TwoLegged("no client secret available".into())
            }
            TokenError::TwoLeggedRejected(source) => Self::TwoLegged(source.to_string()),
            TokenError::Provider(source) => Self::Provider(source.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn status_of(err: AuthError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn authentication_failures_are_indistinguishable() {
        assert_eq!(status_of(AuthError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::NoIdentity), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::NoRefreshToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::RefreshRejected), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AuthError::TwoLegged("x".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn token_error_mapping() {
        let err: AuthError = TokenError::RefreshRejected(Error::OAuth {
            operation: "token refresh",
            status: Some(400),
            detail: "invalid_grant".into(),
        })
        .into();
        assert!(matches!(err, AuthError::RefreshRejected));

        let err: AuthError = TokenError::NoClientSecret.into();
        assert!(matches!(err, AuthError::TwoLegged(_)));
    }
}
