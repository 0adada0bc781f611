#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bankabc_session::auth::{CookieJarStore, SessionStore, Token};
use bankabc_session::{ClientConfig, SessionMachine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;
use url::Url;

/// Signing secret of the mock bank. The client never sees it.
pub const SECRET: &[u8] = b"mock-bank-secret-key-for-tests-only";

pub const PASSWORD: &str = "pw123456";

/// Employee account used by most tests.
pub const EMPLOYEE_EMAIL: &str = "a@b.com";
pub const CUSTOMER_EMAIL: &str = "c@d.com";
pub const ADMIN_EMAIL: &str = "root@bank.abc";
/// Valid password, but the server answers 401 with an empty body.
pub const SILENT_REJECT_EMAIL: &str = "silent@bank.abc";
/// Server answers 200 with a token the client cannot decode.
pub const BROKEN_TOKEN_EMAIL: &str = "broken@bank.abc";
/// Server answers 200 without a token.
pub const NO_TOKEN_EMAIL: &str = "empty@bank.abc";

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Observable state of the mock bank.
#[derive(Default)]
pub struct MockBank {
    pub login_calls: AtomicUsize,
    pub last_login_role: Mutex<Option<String>>,
    pub last_authorization: Mutex<Option<String>>,
    /// Delay before answering a login, in milliseconds
    pub login_delay_ms: AtomicU64,
    /// When set, every protected request gets 401
    pub revoked: AtomicBool,
}

impl MockBank {
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn last_login_role(&self) -> Option<String> {
        self.last_login_role.lock().unwrap().clone()
    }

    pub fn set_login_delay(&self, delay: Duration) {
        self.login_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn revoke_all(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Mint a token the way the bank does.
pub fn mint_token(email: &str, role: &str, id_claim: (&str, u64), exp: u64) -> String {
    let mut claims = json!({
        "sub": email,
        "roles": [role],
        "iat": now(),
        "exp": exp,
    });
    claims[id_claim.0] = json!(id_claim.1);
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

pub fn valid_employee_token() -> String {
    mint_token(EMPLOYEE_EMAIL, "ROLE_EMPLOYEE", ("empId", 42), now() + 3600)
}

pub fn expired_employee_token() -> String {
    mint_token(EMPLOYEE_EMAIL, "ROLE_EMPLOYEE", ("empId", 42), now() - 3600)
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
    role: String,
}

async fn login(State(bank): State<Arc<MockBank>>, Json(body): Json<LoginBody>) -> Response {
    bank.login_calls.fetch_add(1, Ordering::SeqCst);
    *bank.last_login_role.lock().unwrap() = Some(body.role.clone());

    let delay = bank.login_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if body.password != PASSWORD {
        return (StatusCode::UNAUTHORIZED, "Bad credentials").into_response();
    }

    let (role, id_claim, id) = match body.username.as_str() {
        EMPLOYEE_EMAIL => ("ROLE_EMPLOYEE", ("empId", 42), 3),
        CUSTOMER_EMAIL => ("ROLE_CUSTOMER", ("custId", 7), 4),
        ADMIN_EMAIL => ("ROLE_ADMIN", ("id", 1), 1),
        SILENT_REJECT_EMAIL => return StatusCode::UNAUTHORIZED.into_response(),
        BROKEN_TOKEN_EMAIL => {
            return Json(json!({"token": "not-a-jwt", "type": "Bearer"})).into_response();
        }
        NO_TOKEN_EMAIL => return Json(json!({"type": "Bearer"})).into_response(),
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "User not found", "status": 401})),
            )
                .into_response();
        }
    };

    let token = mint_token(&body.username, role, id_claim, now() + 3600);
    let emp_id = if role == "ROLE_EMPLOYEE" {
        json!(42)
    } else {
        Value::Null
    };
    Json(json!({
        "token": token,
        "type": "Bearer",
        "id": id,
        "username": body.username,
        "empId": emp_id,
        "roles": [role],
    }))
    .into_response()
}

/// Claims of a valid bearer token, or `None`.
fn authorize(bank: &MockBank, headers: &HeaderMap) -> Option<Value> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    *bank.last_authorization.lock().unwrap() = Some(value.to_string());
    if bank.revoked.load(Ordering::SeqCst) {
        return None;
    }
    let token = value.strip_prefix("Bearer ")?;
    jsonwebtoken::decode::<Value>(
        token,
        &DecodingKey::from_secret(SECRET),
        &Validation::new(Algorithm::HS256),
    )
    .ok()
    .map(|data| data.claims)
}

async fn employee(
    State(bank): State<Arc<MockBank>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    let Some(claims) = authorize(&bank, &headers) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if claims.get("empId").and_then(Value::as_u64) != Some(id) {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!({
        "empName": "Ada Teller",
        "email": EMPLOYEE_EMAIL,
        "phone": "555-0142",
        "branchName": "Main Street",
    }))
    .into_response()
}

async fn branches(State(bank): State<Arc<MockBank>>, headers: HeaderMap) -> Response {
    *bank.last_authorization.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!([{"branchName": "Main Street"}])).into_response()
}

/// Delay before `/api/slow` refuses its request.
pub const SLOW_REFUSAL_DELAY: Duration = Duration::from_millis(400);

/// Refuses every token, but only after a delay.
async fn slow_refusal() -> Response {
    tokio::time::sleep(SLOW_REFUSAL_DELAY).await;
    StatusCode::UNAUTHORIZED.into_response()
}

fn mock_router(bank: Arc<MockBank>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/employee/employees/{id}", get(employee))
        .route("/api/public/branches", get(branches))
        .route("/api/slow", get(slow_refusal))
        .with_state(bank)
}

pub struct TestContext {
    pub base_url: Url,
    pub bank: Arc<MockBank>,
    pub cookie_dir: PathBuf,
    server_handle: tokio::task::JoinHandle<()>,
}

pub async fn setup() -> TestContext {
    let bank = Arc::new(MockBank::default());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local address");

    let app = mock_router(bank.clone());
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    TestContext {
        base_url: Url::parse(&format!("http://{}", addr)).unwrap(),
        bank,
        cookie_dir: fresh_cookie_dir(),
        server_handle,
    }
}

pub fn fresh_cookie_dir() -> PathBuf {
    let n = NEXT_DIR.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("bankabc-test-{}-{}", std::process::id(), n));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

impl TestContext {
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(
            self.base_url.clone(),
            self.cookie_dir.clone(),
            Duration::from_secs(5),
        )
    }

    /// Start a client session, as a page load would.
    pub fn page_load(&self) -> SessionMachine {
        SessionMachine::from_config(&self.config()).expect("Failed to build session")
    }

    /// The cookie slot the client uses for this server.
    pub fn cookie_store(&self) -> CookieJarStore {
        CookieJarStore::new(&self.cookie_dir, &self.config().api_base)
    }

    pub fn stored_token(&self) -> Option<Token> {
        self.cookie_store().load()
    }

    pub fn seed_token(&self, raw: &str) {
        self.cookie_store().save(&Token::new(raw)).unwrap();
    }

    pub async fn teardown(self) {
        self.server_handle.abort();
        let _ = std::fs::remove_dir_all(&self.cookie_dir);
    }
}
