//! Plug-and-play APS authentication middleware for Axum.
//!
//! This module eliminates the OAuth2 session boilerplate for Axum
//! applications talking to APS: credential intake, the login/callback/
//! logout routes, the per-request session gate, and the extractors that
//! hand validated tokens to route handlers.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use aps_session_auth::middleware::{
//!     ApsAuthConfig, AuthState, MemorySessionStore, UserTokens, auth_routes,
//! };
//!
//! let config = ApsAuthConfig::from_env()?;
//! let state = AuthState::new(config, MemorySessionStore::default());
//!
//! let app = axum::Router::new()
//!     .merge(auth_routes(state.clone()))
//!     .route("/api/hubs", axum::routing::get(list_hubs))
//!     .with_state(state);
//!
//! // The extractor runs the session gate: identity check, lazy refresh,
//! // and 401 on failure. Handlers only ever see valid tokens.
//! async fn list_hubs(tokens: UserTokens) -> String {
//!     format!("bearer {}", tokens.internal.access_token)
//! }
//! ```
//!
//! Operations that only need app-level access (bulk collection/definition
//! listing) use the [`AppToken`] extractor instead; it never demands a
//! logged-in user.

mod config;
mod cookies;
mod error;
mod extractor;
mod memory;
mod routes;
mod state;
mod traits;

pub use config::ApsAuthConfig;
pub use error::AuthError;
pub use extractor::{AppToken, UserTokens};
pub use memory::MemorySessionStore;
pub use routes::auth_routes;
pub use state::AuthState;
pub use traits::{BoxError, SessionStore};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
