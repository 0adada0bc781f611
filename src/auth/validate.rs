//! Local credential checks run before any network call.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::types::Credentials;

/// Minimum accepted password length, in UTF-16 code units as the login form counts.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Something, an `@`, something, a dot, something. Same check as the login form.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("Invalid regex pattern for email"));

/// Per-field validation messages. A `None` field passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl ValidationError {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = [self.email, self.password].into_iter().flatten().collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl std::error::Error for ValidationError {}

/// Check the email field.
pub fn validate_email(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("Email is required.")
    } else if !EMAIL_PATTERN.is_match(value) {
        Some("Please enter a valid email address.")
    } else {
        None
    }
}

/// Check the password field.
pub fn validate_password(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("Password is required.")
    } else if value.encode_utf16().count() < MIN_PASSWORD_LENGTH {
        Some("Password must be at least 6 characters.")
    } else {
        None
    }
}

/// Validate both fields, reporting every failure at once.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    let error = ValidationError {
        email: validate_email(&credentials.identifier),
        password: validate_password(&credentials.secret),
    };
    if error.is_empty() { Ok(()) } else { Err(error) }
}
