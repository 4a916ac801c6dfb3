//! In-memory client-secret registry for multi-tenant deployments.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::ClientId;

/// Maps a public client id to its confidentially held secret.
///
/// A session owner who knows their app secret may register it here to make
/// the app usable by other sessions of the same deployment (login without
/// the secret, and admin-elevated 2-legged tokens). Registration is opt-in
/// and process-lifetime only: the mapping is not persisted and is
/// re-derivable by the owner re-entering credentials after a restart.
///
/// `Clone` is cheap and shares the underlying map, so one instance can be
/// injected into the factory, the routes, and anything else that needs it.
/// No operation fails: an absent entry just means no elevated capability is
/// available for that id.
#[derive(Debug, Clone, Default)]
pub struct ClientCredentialRegistry {
    inner: Arc<RwLock<HashMap<ClientId, String>>>,
}

impl ClientCredentialRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the secret for `client_id`.
    pub fn register(&self, client_id: ClientId, client_secret: impl Into<String>) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(client_id, client_secret.into());
    }

    /// Remove the first entry whose secret matches; no-op when none does.
    ///
    /// Keyed by secret rather than id: a caller proving deletion only holds
    /// the secret, which doubles as a crude ownership check.
    pub fn unregister(&self, client_secret: &str) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = map
            .iter()
            .find(|(_, secret)| secret.as_str() == client_secret)
            .map(|(id, _)| id.clone())
        {
            map.remove(&id);
        }
    }

    /// Secret registered for `client_id`, if any.
    #[must_use]
    pub fn lookup(&self, client_id: &ClientId) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(client_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup() {
        let registry = ClientCredentialRegistry::new();
        registry.register(ClientId::from("acme"), "s3cr3t");
        assert_eq!(registry.lookup(&ClientId::from("acme")).as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn lookup_absent_is_silent() {
        let registry = ClientCredentialRegistry::new();
        assert_eq!(registry.lookup(&ClientId::from("nobody")), None);
    }

    #[test]
    fn register_overwrites() {
        let registry = ClientCredentialRegistry::new();
        registry.register(ClientId::from("acme"), "old");
        registry.register(ClientId::from("acme"), "new");
        assert_eq!(registry.lookup(&ClientId::from("acme")).as_deref(), Some("new"));
    }

    #[test]
    fn unregister_by_secret() {
        let registry = ClientCredentialRegistry::new();
        registry.register(ClientId::from("acme"), "s3cr3t");
        registry.unregister("s3cr3t");
        assert_eq!(registry.lookup(&ClientId::from("acme")), None);
    }

    #[test]
    fn unregister_unknown_secret_is_noop() {
        let registry = ClientCredentialRegistry::new();
        registry.register(ClientId::from("acme"), "s3cr3t");
        registry.unregister("other");
        assert_eq!(registry.lookup(&ClientId::from("acme")).as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn clones_share_state() {
        let registry = ClientCredentialRegistry::new();
        let other = registry.clone();
        other.register(ClientId::from("acme"), "s3cr3t");
        assert_eq!(registry.lookup(&ClientId::from("acme")).as_deref(), Some("s3cr3t"));
    }
}
