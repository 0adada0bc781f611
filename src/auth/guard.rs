//! Route guard: decides whether a view may render for the current session.
//!
//! The guard is a routing convenience. The server re-checks every request, so
//! a wrong decision here can only show or hide a view, never leak data.

use super::types::SessionState;
use crate::role::RoleTag;

/// View where unauthenticated users are sent.
pub const LOGIN_VIEW: &str = "/login";

/// Account creation view.
pub const SIGNUP_VIEW: &str = "/signup";

/// What a view needs from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Anyone may view
    Public,
    /// Only signed-out users (login, signup); signed-in users go to their landing view
    GuestOnly,
    /// Any signed-in user
    AnyAuthenticated,
    /// Signed-in users holding this role
    Role(RoleTag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny { redirect: &'static str },
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Type-level requirement, for views whose requirement is fixed at compile time.
pub trait RoleConstraint {
    const REQUIREMENT: Requirement;
}

/// Requires the customer role.
pub struct CustomerOnly;

/// Requires the employee role.
pub struct EmployeeOnly;

/// Requires the admin role.
pub struct AdminOnly;

/// Any signed-in user.
pub struct AnyRole;

impl RoleConstraint for CustomerOnly {
    const REQUIREMENT: Requirement = Requirement::Role(RoleTag::Customer);
}

impl RoleConstraint for EmployeeOnly {
    const REQUIREMENT: Requirement = Requirement::Role(RoleTag::Employee);
}

impl RoleConstraint for AdminOnly {
    const REQUIREMENT: Requirement = Requirement::Role(RoleTag::Admin);
}

impl RoleConstraint for AnyRole {
    const REQUIREMENT: Requirement = Requirement::AnyAuthenticated;
}

pub struct RouteGuard;

impl RouteGuard {
    /// Decide whether a view with `requirement` may render in `state`.
    pub fn check(requirement: Requirement, state: &SessionState) -> GuardDecision {
        let identity = state.identity();
        match (requirement, identity) {
            (Requirement::Public, _) => GuardDecision::Allow,
            (Requirement::GuestOnly, None) => GuardDecision::Allow,
            (Requirement::GuestOnly, Some(identity)) => GuardDecision::Deny {
                redirect: identity.role.landing_path(),
            },
            (Requirement::AnyAuthenticated | Requirement::Role(_), None) => GuardDecision::Deny {
                redirect: LOGIN_VIEW,
            },
            (Requirement::AnyAuthenticated, Some(_)) => GuardDecision::Allow,
            (Requirement::Role(required), Some(identity)) if identity.role == required => {
                GuardDecision::Allow
            }
            // Cross-role access goes to the user's own landing view, not an error page.
            (Requirement::Role(_), Some(identity)) => GuardDecision::Deny {
                redirect: identity.role.landing_path(),
            },
        }
    }

    pub fn check_for<C: RoleConstraint>(state: &SessionState) -> GuardDecision {
        Self::check(C::REQUIREMENT, state)
    }

    /// Requirement of a BankABC view path.
    pub fn requirement_for(path: &str) -> Requirement {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        if path == "/" {
            return Requirement::Public;
        }
        if path == LOGIN_VIEW || path == SIGNUP_VIEW {
            return Requirement::GuestOnly;
        }
        RoleTag::ALL
            .into_iter()
            .find(|role| under(path, role_prefix(*role)))
            .map_or(Requirement::AnyAuthenticated, Requirement::Role)
    }

    pub fn check_path(path: &str, state: &SessionState) -> GuardDecision {
        Self::check(Self::requirement_for(path), state)
    }
}

fn role_prefix(role: RoleTag) -> &'static str {
    match role {
        RoleTag::Customer => "/customer",
        RoleTag::Employee => "/employee",
        RoleTag::Admin => "/admin",
    }
}

/// `path` is `prefix` or a descendant of it (`/admin` matches `/admin/x`, not `/administer`).
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
