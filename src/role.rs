//! User roles and their backend identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role selected on the login tabs.
///
/// Every tag maps to exactly one backend role identifier and one landing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    Customer,
    Employee,
    Admin,
}

impl RoleTag {
    /// All roles, in login tab order.
    pub const ALL: [RoleTag; 3] = [RoleTag::Customer, RoleTag::Employee, RoleTag::Admin];

    /// Identifier the backend uses for this role (e.g. `ROLE_CUSTOMER`).
    pub fn backend_id(&self) -> &'static str {
        match self {
            RoleTag::Customer => "ROLE_CUSTOMER",
            RoleTag::Employee => "ROLE_EMPLOYEE",
            RoleTag::Admin => "ROLE_ADMIN",
        }
    }

    /// Inverse of [`RoleTag::backend_id`]. Unknown identifiers yield `None`.
    pub fn from_backend_id(id: &str) -> Option<Self> {
        match id {
            "ROLE_CUSTOMER" => Some(RoleTag::Customer),
            "ROLE_EMPLOYEE" => Some(RoleTag::Employee),
            "ROLE_ADMIN" => Some(RoleTag::Admin),
            _ => None,
        }
    }

    /// View a freshly authenticated user of this role lands on.
    pub fn landing_path(&self) -> &'static str {
        match self {
            RoleTag::Customer => "/customer/dashboard",
            RoleTag::Employee => "/employee/dashboard",
            RoleTag::Admin => "/admin/dashboard",
        }
    }

    /// Label shown on the login tab.
    pub fn label(&self) -> &'static str {
        match self {
            RoleTag::Customer => "Customer",
            RoleTag::Employee => "Employee",
            RoleTag::Admin => "Admin",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a string names no known role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown role '{}' (expected customer, employee or admin)",
            self.0
        )
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for RoleTag {
    type Err = UnknownRole;

    /// Accepts the tab label in any case, or the backend identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(role) = RoleTag::from_backend_id(trimmed) {
            return Ok(role);
        }
        RoleTag::ALL
            .into_iter()
            .find(|role| role.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
