pub mod auth;
pub mod cli;
pub mod client_config;
pub mod jwt;
pub mod role;

pub use auth::{
    AuthGateway, Credentials, GuardDecision, Identity, LoginError, LoginSuccess, RouteGuard,
    SessionMachine, SessionState,
};
pub use client_config::ClientConfig;
pub use role::RoleTag;
