//! HTTP access to the remote banking service.
//!
//! All requests to the protected API go through [`AuthGateway::send`], which
//! signs them with the stored token and reports 401/403 to the session.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::errors::{AuthError, GatewayError};
use super::store::SessionStore;
use super::types::{Credentials, Token};
use crate::client_config::ClientConfig;

/// Login endpoint, relative to the API base.
pub const LOGIN_PATH: &str = "api/auth/login";

/// Told when the server refuses a request the gateway signed.
///
/// Called before [`AuthGateway::send`] returns, so the session has already
/// reacted when the caller sees [`GatewayError::Unauthorized`].
pub trait RefusalHandler: Send + Sync {
    /// `sent` is the token the refused request carried, `None` if it was unsigned.
    fn token_refused(&self, sent: Option<&Token>, status: StatusCode);
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    role: &'static str,
}

/// Login response. Only the token is needed; the other fields are tolerated.
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Clone)]
pub struct AuthGateway {
    client: reqwest::Client,
    api_base: Url,
    store: Arc<dyn SessionStore>,
    refusals: Arc<dyn RefusalHandler>,
}

impl AuthGateway {
    /// Create a gateway reading tokens from `store` and reporting 401/403
    /// responses to `refusals`.
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
        refusals: Arc<dyn RefusalHandler>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            store,
            refusals,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_base.join(path.trim_start_matches('/'))
    }

    /// Exchange credentials for a token.
    ///
    /// Sends the backend role identifier, never the tab label.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Token, AuthError> {
        let url = self
            .endpoint(LOGIN_PATH)
            .map_err(|e| AuthError::Protocol(e.to_string()))?;
        let body = LoginRequest {
            username: &credentials.identifier,
            password: &credentials.secret,
            role: credentials.requested_role.backend_id(),
        };

        let response = match self.client.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login request failed");
                return Err(AuthError::Unreachable);
            }
        };

        let status = response.status();
        if status.is_client_error() {
            let text = response.text().await.unwrap_or_default();
            info!(status = %status, "Login rejected");
            return Err(AuthError::Rejected(rejection_message(&text)));
        }
        if !status.is_success() {
            warn!(status = %status, "Login endpoint returned an error");
            return Err(AuthError::Unreachable);
        }

        let body: LoginResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Invalid login response");
            AuthError::Protocol(e.to_string())
        })?;

        match body.token {
            Some(token) if !token.is_empty() => Ok(Token::new(token)),
            _ => Err(AuthError::Protocol("response carries no token".to_string())),
        }
    }

    /// Add the stored token as a bearer credential, if there is one.
    pub fn attach_auth(&self, request: RequestBuilder) -> RequestBuilder {
        self.sign(request).0
    }

    /// Like [`attach_auth`](Self::attach_auth), also returning the token used.
    fn sign(&self, request: RequestBuilder) -> (RequestBuilder, Option<Token>) {
        match self.store.load() {
            Some(token) => (request.bearer_auth(token.as_str()), Some(token)),
            None => (request, None),
        }
    }

    /// Start a request against the API base.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        let url = self.endpoint(path).map_err(GatewayError::InvalidPath)?;
        Ok(self.client.request(method, url))
    }

    /// Sign and send a request. A 401/403 is reported against the token the
    /// request carried, which ends the session if that token is still current.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let (request, sent) = self.sign(request);
        let response = request.send().await.map_err(GatewayError::Unreachable)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            info!(status = %status, signed = sent.is_some(), "Server refused request");
            self.refusals.token_refused(sent.as_ref(), status);
            return Err(GatewayError::Unauthorized);
        }
        Ok(response)
    }

    /// GET `path` and parse the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status(status));
        }
        response.json().await.map_err(GatewayError::InvalidBody)
    }
}

/// Pull a user-facing message out of an error body.
///
/// Accepts `{"message": ...}` or `{"error": ...}` JSON, a JSON string, or plain text.
fn rejection_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => ["message", "error"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(serde_json::Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Ok(serde_json::Value::String(s)) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Ok(_) => None,
        Err(_) => Some(body.to_string()),
    }
}
