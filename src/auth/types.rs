//! Session value types.

use serde::Serialize;
use std::fmt;

use crate::role::RoleTag;

/// Bearer token issued by the remote service.
///
/// Opaque to the client apart from the claims read by [`crate::jwt::decode`].
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Login form input. Lives only for the duration of one login attempt.
#[derive(Clone)]
pub struct Credentials {
    /// Email or username
    pub identifier: String,
    /// Password
    pub secret: String,
    /// Role tab the user picked
    pub requested_role: RoleTag,
}

impl Credentials {
    pub fn new(
        identifier: impl Into<String>,
        secret: impl Into<String>,
        requested_role: RoleTag,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            requested_role,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .field("requested_role", &self.requested_role)
            .finish()
    }
}

/// Who is signed in, as read from the token claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub role: RoleTag,
    /// Numeric subject id (employee id, customer id, ...), rendered as a string
    pub subject_id: Option<String>,
    pub username: Option<String>,
    /// Every claim in the token payload, including ones this crate ignores
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Authentication state of one client session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated(Identity),
    /// Transient; the machine settles back to `Unauthenticated` right after.
    Failed(String),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// One-time message for the UI, consumed with `SessionMachine::take_notice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    /// The server rejected the stored token and the session was ended.
    SessionExpired,
}

impl SessionNotice {
    pub fn message(&self) -> &'static str {
        match self {
            SessionNotice::SessionExpired => "Your session has expired. Please sign in again.",
        }
    }
}

/// Result of a successful login, enough for the caller to route.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSuccess {
    pub role: RoleTag,
    pub landing_path: &'static str,
    pub identity: Identity,
}
