//! Authentication error types.

use std::fmt;
use std::path::PathBuf;

use super::validate::ValidationError;
use crate::jwt::DecodeError;
use crate::role::RoleTag;

/// Shown when the server rejects a login without saying why.
pub const GENERIC_SIGNIN_FAILURE: &str = "Signin failed. Please try again.";

/// Shown when the server cannot be reached.
pub const CONNECTIVITY_FAILURE: &str =
    "Unable to reach the bank. Check your connection and try again.";

/// Errors from the login exchange with the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// 4xx from the login endpoint, with the server's message when it sent one
    Rejected(Option<String>),
    /// Network failure, timeout, or server-side error
    Unreachable,
    /// 2xx response without a usable token
    Protocol(String),
}

impl AuthError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> &str {
        match self {
            AuthError::Rejected(Some(message)) => message,
            AuthError::Rejected(None) | AuthError::Protocol(_) => GENERIC_SIGNIN_FAILURE,
            AuthError::Unreachable => CONNECTIVITY_FAILURE,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Rejected(Some(message)) => write!(f, "Login rejected: {}", message),
            AuthError::Rejected(None) => write!(f, "Login rejected"),
            AuthError::Unreachable => write!(f, "Authentication service unreachable"),
            AuthError::Protocol(detail) => write!(f, "Unexpected login response: {}", detail),
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors from requests sent through the gateway.
#[derive(Debug)]
pub enum GatewayError {
    /// Server answered 401/403; the session has been ended
    Unauthorized,
    /// Network failure or timeout
    Unreachable(reqwest::Error),
    /// Any other non-success status
    Status(reqwest::StatusCode),
    /// Response body did not match the expected shape
    InvalidBody(reqwest::Error),
    /// Path could not be joined onto the API base URL
    InvalidPath(url::ParseError),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Unauthorized => write!(f, "Session is no longer authorized"),
            GatewayError::Unreachable(e) => write!(f, "Request failed: {}", e),
            GatewayError::Status(status) => write!(f, "Unexpected status {}", status),
            GatewayError::InvalidBody(e) => write!(f, "Invalid response body: {}", e),
            GatewayError::InvalidPath(e) => write!(f, "Invalid request path: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Why a login attempt did not produce a session.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginError {
    /// Input failed local checks; nothing was sent
    Validation(ValidationError),
    /// Another login is still in flight
    InProgress,
    Auth(AuthError),
    /// Credentials are valid, but for another role than the one selected
    RoleMismatch { requested: RoleTag, actual: RoleTag },
    /// Server returned a token this client cannot read
    Token(DecodeError),
    /// Session changed while the exchange was pending; response discarded
    Superseded,
}

impl LoginError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            LoginError::Validation(_) => "Please fix the errors before submitting.".to_string(),
            LoginError::InProgress => "A sign-in is already in progress.".to_string(),
            LoginError::Auth(e) => e.user_message().to_string(),
            LoginError::RoleMismatch { requested, .. } => {
                format!("Wrong credentials for role {}.", requested)
            }
            LoginError::Token(_) | LoginError::Superseded => GENERIC_SIGNIN_FAILURE.to_string(),
        }
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::Validation(e) => write!(f, "{}", e),
            LoginError::InProgress => write!(f, "Login already in progress"),
            LoginError::Auth(e) => write!(f, "{}", e),
            LoginError::RoleMismatch { requested, actual } => write!(
                f,
                "Role mismatch: requested {} but server authenticated {}",
                requested, actual
            ),
            LoginError::Token(e) => write!(f, "{}", e),
            LoginError::Superseded => write!(f, "Login attempt superseded"),
        }
    }
}

impl std::error::Error for LoginError {}

impl From<ValidationError> for LoginError {
    fn from(e: ValidationError) -> Self {
        LoginError::Validation(e)
    }
}

impl From<AuthError> for LoginError {
    fn from(e: AuthError) -> Self {
        LoginError::Auth(e)
    }
}

impl From<DecodeError> for LoginError {
    fn from(e: DecodeError) -> Self {
        LoginError::Token(e)
    }
}

/// Errors writing the session slot.
#[derive(Debug)]
pub struct StoreError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to write session cookie {}: {}",
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
