//! The session state machine.
//!
//! One `SessionMachine` exists per client session. It is the only writer of
//! the session state and of the session store. The gateway reports 401/403
//! responses through [`RefusalHandler`], which the machine's core implements,
//! so the transition is published before the refused request returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::StatusCode;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::errors::LoginError;
use super::gateway::{AuthGateway, RefusalHandler};
use super::guard::{GuardDecision, RouteGuard};
use super::store::{CookieJarStore, SessionStore};
use super::types::{Credentials, Identity, LoginSuccess, SessionNotice, SessionState, Token};
use super::validate::validate_credentials;
use crate::client_config::ClientConfig;
use crate::jwt;

/// State and store, shared with the gateway's refusal callback.
///
/// Every store write happens while the state channel is locked, so the token
/// on disk always belongs to the state observers see.
struct SessionCore {
    store: Arc<dyn SessionStore>,
    state: watch::Sender<SessionState>,
    notice: Mutex<Option<SessionNotice>>,
}

impl RefusalHandler for SessionCore {
    fn token_refused(&self, sent: Option<&Token>, status: StatusCode) {
        let mut stale = false;
        let ended = self.state.send_if_modified(|state| {
            if self.store.load().as_ref() != sent {
                stale = true;
                return false;
            }
            if sent.is_some() {
                self.store.clear();
            }
            if !state.is_authenticated() {
                return false;
            }
            *state = SessionState::Unauthenticated;
            true
        });

        if stale {
            debug!(status = %status, "Refused token is no longer current, ignoring");
        } else if ended {
            warn!(status = %status, "Session expired or revoked by the server");
            *self.notice.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(SessionNotice::SessionExpired);
        }
    }
}

pub struct SessionMachine {
    core: Arc<SessionCore>,
    gateway: AuthGateway,
    /// Number of the most recent login attempt
    attempt: AtomicU64,
}

impl SessionMachine {
    /// Build the machine and restore any session left in `store`.
    ///
    /// A stored token that decodes is trusted for routing without a network
    /// round-trip; one that does not is cleared.
    pub fn start(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, reqwest::Error> {
        let initial = match store.load() {
            None => SessionState::Unauthenticated,
            Some(token) => match jwt::decode(token.as_str()) {
                Ok(identity) => {
                    info!(role = %identity.role, "Session restored");
                    SessionState::Authenticated(identity)
                }
                Err(e) => {
                    warn!(error = %e, "Stored session token unreadable, clearing it");
                    store.clear();
                    SessionState::Unauthenticated
                }
            },
        };

        let core = Arc::new(SessionCore {
            store: store.clone(),
            state: watch::Sender::new(initial),
            notice: Mutex::new(None),
        });
        let gateway = AuthGateway::new(config, store, core.clone())?;

        Ok(Self {
            core,
            gateway,
            attempt: AtomicU64::new(0),
        })
    }

    /// Machine backed by the cookie jar and gateway described by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let store = Arc::new(CookieJarStore::new(&config.cookie_dir, &config.api_base));
        Self::start(config, store)
    }

    /// Gateway for requests to the protected API.
    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    pub fn state(&self) -> SessionState {
        self.core.state.borrow().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.core.state.borrow().identity().cloned()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.core.state.subscribe()
    }

    /// Pending notice for the UI. Each notice is returned once.
    pub fn take_notice(&self) -> Option<SessionNotice> {
        self.core
            .notice
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Route guard decision for a view path in the current state.
    pub fn guard(&self, path: &str) -> GuardDecision {
        RouteGuard::check_path(path, &self.state())
    }

    /// Sign in with `credentials`.
    ///
    /// Fails without contacting the server when the input is invalid or
    /// another login is in flight. On success the token is persisted and the
    /// resolved role is returned for routing.
    pub async fn login(&self, credentials: Credentials) -> Result<LoginSuccess, LoginError> {
        validate_credentials(&credentials)?;

        let mut attempt = 0;
        let started = self.core.state.send_if_modified(|state| {
            if matches!(state, SessionState::Authenticating) {
                return false;
            }
            if state.is_authenticated() {
                self.core.store.clear();
            }
            attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
            *state = SessionState::Authenticating;
            true
        });
        if !started {
            debug!("Login ignored, another attempt is in flight");
            return Err(LoginError::InProgress);
        }

        let requested = credentials.requested_role;
        info!(attempt, role = %requested, "Signing in");
        let result = self.exchange(&credentials).await;
        drop(credentials);

        match result {
            Ok((token, identity)) => {
                let applied = self.core.state.send_if_modified(|state| {
                    if !self.is_current(attempt, state) {
                        return false;
                    }
                    if let Err(e) = self.core.store.save(&token) {
                        warn!(error = %e, "Session will not survive a restart");
                    }
                    *state = SessionState::Authenticated(identity.clone());
                    true
                });
                if !applied {
                    info!(attempt, "Discarding stale login response");
                    return Err(LoginError::Superseded);
                }

                info!(attempt, role = %identity.role, "Signed in");
                Ok(LoginSuccess {
                    role: identity.role,
                    landing_path: identity.role.landing_path(),
                    identity,
                })
            }
            Err(e) => {
                let applied = self.core.state.send_if_modified(|state| {
                    if !self.is_current(attempt, state) {
                        return false;
                    }
                    *state = SessionState::Failed(e.to_string());
                    true
                });
                if !applied {
                    info!(attempt, "Discarding stale login failure");
                    return Err(LoginError::Superseded);
                }

                info!(attempt, error = %e, "Sign in failed");
                self.settle_failure();
                Err(e)
            }
        }
    }

    async fn exchange(&self, credentials: &Credentials) -> Result<(Token, Identity), LoginError> {
        let token = self.gateway.authenticate(credentials).await?;
        let identity = jwt::decode(token.as_str())?;
        if identity.role != credentials.requested_role {
            return Err(LoginError::RoleMismatch {
                requested: credentials.requested_role,
                actual: identity.role,
            });
        }
        Ok((token, identity))
    }

    fn is_current(&self, attempt: u64, state: &SessionState) -> bool {
        self.attempt.load(Ordering::SeqCst) == attempt
            && matches!(state, SessionState::Authenticating)
    }

    /// `Failed` is reported, then replaced by `Unauthenticated`.
    fn settle_failure(&self) {
        self.core.state.send_if_modified(|state| {
            if matches!(state, SessionState::Failed(_)) {
                *state = SessionState::Unauthenticated;
                true
            } else {
                false
            }
        });
    }

    /// End the session. The stored token is gone before this returns.
    /// Calling it again is a no-op.
    pub fn logout(&self) {
        let changed = self.core.state.send_if_modified(|state| {
            self.core.store.clear();
            if matches!(state, SessionState::Unauthenticated) {
                return false;
            }
            *state = SessionState::Unauthenticated;
            true
        });
        if changed {
            info!("Signed out");
        }
    }
}
