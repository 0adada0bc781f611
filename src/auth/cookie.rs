//! Cookie formatting and parsing for the persisted session slot.

/// Cookie name for the session token.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Format the cookie line stored for `value`.
pub fn format_cookie(name: &str, value: &str) -> String {
    format!("{}={}; Path=/; SameSite=Strict", name, value)
}

/// Extract a cookie value from a `Cookie`/`Set-Cookie` style string.
///
/// Attributes (`Path`, `SameSite`, ...) are ignored; empty values count as absent.
pub fn get_cookie<'a>(cookie_line: &'a str, name: &str) -> Option<&'a str> {
    for part in cookie_line.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }
    }
    None
}
