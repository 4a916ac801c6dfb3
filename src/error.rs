/// Errors from the APS identity provider client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Network-level failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider answered, but with a non-success status.
    #[error("OAuth2 {operation} failed (status {status:?}): {detail}")]
    OAuth {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
}
