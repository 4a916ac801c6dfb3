#![doc = include_str!("../README.md")]

pub mod csrf;
pub mod error;
pub mod factory;
pub mod lifecycle;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod oauth;
pub mod registry;
pub mod scopes;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use error::Error;
pub use factory::{ApsClientFactory, ClientFactory};
pub use lifecycle::{TokenError, TokenLifecycleManager};
pub use oauth::{
    AuthClient, AuthorizationFlows, Profile, ProfileLookup, ProviderConfig, TokenResponse,
};
pub use registry::ClientCredentialRegistry;
pub use scopes::ScopeSet;
pub use session::{Session, TokenPair};
pub use types::{ClientId, SessionId};
