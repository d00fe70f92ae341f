//! Session-related types.
//!
//! Types describing the authenticated identity and its bearer token. The
//! store that manages them lives in [`crate::stores::session`].

use serde::{Deserialize, Serialize};

use saffron_core::{Email, Role, UserId};

/// The authenticated user's identity as reported by the backend.
///
/// Never carries a password or other credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend user id.
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Account email.
    pub email: Email,
    /// Account role. Unrecognized roles degrade to `Customer`.
    #[serde(default)]
    pub role: Role,
}

/// Opaque bearer token issued by the backend at login/registration.
///
/// The raw value never appears in `Debug` output or logs; it is exposed only
/// at the wire boundary via [`SessionToken::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a backend-issued token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Expose the raw token for an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

/// An authenticated session: who the user is, plus the token that proves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The authenticated identity.
    pub identity: Identity,
    /// Bearer token for authorized backend calls.
    pub token: SessionToken,
}

impl Session {
    /// Whether this session may manage the catalog.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.identity.role.is_admin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = SessionToken::new("eyJhbGciOi.secret.value");
        let debug = format!("{token:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_identity_deserializes_backend_shape() {
        let json = r#"{
            "_id": "u42",
            "name": "Priya",
            "email": "priya@example.com",
            "role": "Admin"
        }"#;

        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id.as_str(), "u42");
        assert!(identity.role.is_admin());
    }

    #[test]
    fn test_identity_defaults_role_to_customer() {
        let json = r#"{"_id": "u1", "name": "Dev", "email": "dev@example.com"}"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.role, Role::Customer);
    }

    #[test]
    fn test_session_admin_gate() {
        let identity: Identity = serde_json::from_str(
            r#"{"_id": "u1", "name": "Dev", "email": "dev@example.com", "role": "Customer"}"#,
        )
        .unwrap();
        let session = Session {
            identity,
            token: SessionToken::new("t"),
        };
        assert!(!session.is_admin());
    }
}
