//! Bearer token decoding.
//!
//! The client never verifies token signatures: trust is delegated to the
//! remote service, which re-checks the token on every request. Claims are
//! read only to decide which views to show.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::auth::Identity;
use crate::role::RoleTag;

/// Claims checked, in order, for the numeric subject id.
const SUBJECT_ID_CLAIMS: [&str; 5] = ["empId", "custId", "adminId", "id", "userId"];

/// Errors that can occur while decoding a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Token is not a well-formed JWT or carries no usable role claim
    Malformed(&'static str),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Malformed(reason) => write!(f, "Malformed token: {}", reason),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a token into the identity it claims.
pub fn decode(token: &str) -> Result<Identity, DecodeError> {
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeError::Malformed("expected three segments"));
    };

    jsonwebtoken::decode_header(token).map_err(|_| DecodeError::Malformed("invalid header"))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| DecodeError::Malformed("payload is not base64url"))?;

    let claims: Map<String, Value> = match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(DecodeError::Malformed("payload is not an object")),
        Err(_) => return Err(DecodeError::Malformed("payload is not JSON")),
    };

    let role = role_claim(&claims).ok_or(DecodeError::Malformed("missing role claim"))?;
    let subject_id = SUBJECT_ID_CLAIMS
        .iter()
        .find_map(|name| claims.get(*name).and_then(claim_as_string));
    let username = ["username", "sub"]
        .iter()
        .find_map(|name| claims.get(*name).and_then(Value::as_str))
        .map(str::to_string);

    Ok(Identity {
        role,
        subject_id,
        username,
        claims,
    })
}

/// Find the first known role in `role` or `roles`.
///
/// `roles` may hold plain strings or Spring-style `{"authority": "ROLE_X"}` objects.
fn role_claim(claims: &Map<String, Value>) -> Option<RoleTag> {
    if let Some(role) = claims
        .get("role")
        .and_then(Value::as_str)
        .and_then(RoleTag::from_backend_id)
    {
        return Some(role);
    }

    claims
        .get("roles")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("authority").and_then(Value::as_str),
            _ => None,
        })
        .find_map(RoleTag::from_backend_id)
}

fn claim_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
