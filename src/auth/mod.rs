//! Client-side session handling with role-based routing.
//!
//! A bearer token from the login endpoint is kept in a cookie slot, decoded
//! for the signed-in role, attached to every API request, and dropped when
//! the server stops accepting it.

mod cookie;
mod errors;
mod gateway;
mod guard;
mod machine;
mod store;
mod types;
mod validate;

pub use cookie::{AUTH_COOKIE_NAME, format_cookie, get_cookie};
pub use errors::{
    AuthError, CONNECTIVITY_FAILURE, GENERIC_SIGNIN_FAILURE, GatewayError, LoginError, StoreError,
};
pub use gateway::{AuthGateway, LOGIN_PATH, RefusalHandler};
pub use guard::{
    AdminOnly, AnyRole, CustomerOnly, EmployeeOnly, GuardDecision, LOGIN_VIEW, Requirement,
    RoleConstraint, RouteGuard, SIGNUP_VIEW,
};
pub use machine::SessionMachine;
pub use store::{CookieJarStore, MemoryStore, SessionStore};
pub use types::{Credentials, Identity, LoginSuccess, SessionNotice, SessionState, Token};
pub use validate::{
    MIN_PASSWORD_LENGTH, ValidationError, validate_credentials, validate_email, validate_password,
};
