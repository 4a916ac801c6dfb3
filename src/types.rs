use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// APS OAuth2 client identifier (opaque string issued by the provider).
///
/// A session without a `ClientId` of its own uses the deployment's default
/// app credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Browser session identifier (opaque string, ULID by default).
///
/// Returned by [`SessionStore::create`](crate::middleware::SessionStore::create)
/// and carried in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_serde_transparent() {
        let id = ClientId::from("acme");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"acme\"");
        let parsed: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_client_id(_: &ClientId) {}
        fn takes_session_id(_: &SessionId) {}

        let client = ClientId::from("id");
        let session = SessionId::from("id");

        takes_client_id(&client);
        takes_session_id(&session);
        // takes_client_id(&session);  // Compile error!
        // takes_session_id(&client);  // Compile error!
    }
}
