//! Fixed scope lists for the session's two token classes.
//!
//! INTERNAL covers server-side hub data access; PUBLIC is limited to
//! viewable content and is safe to hand to a browser-side viewer. The two
//! lists are process-wide configuration, not session data.

/// Scopes for the broad server-side token.
pub const INTERNAL_TOKEN_SCOPES: &[&str] =
    &["data:read", "data:create", "data:write", "data:search"];

/// Scopes for the narrow viewer token.
pub const PUBLIC_TOKEN_SCOPES: &[&str] = &["viewables:read"];

/// The scope lists an [`ApsClientFactory`](crate::ApsClientFactory) binds
/// into the clients it constructs.
///
/// 2-legged (client-credentials) tokens use the internal list.
#[derive(Debug, Clone)]
pub struct ScopeSet {
    pub internal: Vec<String>,
    pub public: Vec<String>,
}

impl Default for ScopeSet {
    fn default() -> Self {
        Self {
            internal: INTERNAL_TOKEN_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
            public: PUBLIC_TOKEN_SCOPES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}
