//! RBAC Manager - command authorization logic

use crate::messages::InvocationContext;
use crate::rbac::config::RoleTables;
use crate::rbac::role::RoleRef;
use tracing::{debug, warn};

/// Result of a permission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionResult {
    /// Permission granted
    Allowed,
    /// Permission denied with reason
    Denied(String),
}

impl PermissionResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PermissionResult::Allowed)
    }
}

/// RBAC Manager for command authorization
///
/// Authorization fails closed: a command with no required roles, or with any
/// role reference that does not resolve against the configured tables, is
/// denied for every user.
#[derive(Debug, Clone, Default)]
pub struct RbacManager {
    tables: RoleTables,
}

impl RbacManager {
    /// Create a new RBAC manager
    pub fn new(tables: RoleTables) -> Self {
        Self { tables }
    }

    /// Configured role tables
    pub fn tables(&self) -> &RoleTables {
        &self.tables
    }

    /// Check whether a role reference resolves against the configured tables
    pub fn is_role_valid(&self, role: &RoleRef) -> bool {
        match role {
            RoleRef::All => true,
            RoleRef::Named(name) => self.tables.named.contains_key(name),
            RoleRef::Platform(name) => self.tables.platform.contains_key(name),
        }
    }

    /// Check whether the invoking user satisfies one role reference
    pub fn user_has_role(&self, role: &RoleRef, ctx: &InvocationContext) -> bool {
        match role {
            RoleRef::All => true,
            RoleRef::Named(name) => self
                .tables
                .named
                .get(name)
                .is_some_and(|members| members.contains(&ctx.user_id)),
            RoleRef::Platform(name) => match self.tables.platform.get(name) {
                Some(role_id) => ctx.platform_roles.iter().any(|r| r == role_id),
                None => false,
            },
        }
    }

    /// Decide whether the user may run a command requiring any of `required`
    pub fn authorize(&self, required: &[RoleRef], ctx: &InvocationContext) -> PermissionResult {
        if required.is_empty() {
            return PermissionResult::Denied("no role assigned to command".to_string());
        }

        if let Some(invalid) = required.iter().find(|role| !self.is_role_valid(role)) {
            warn!("role '{}' is not configured", invalid);
            return PermissionResult::Denied(format!("role '{}' is not configured", invalid));
        }

        match required.iter().find(|role| self.user_has_role(role, ctx)) {
            Some(role) => {
                debug!("user {} granted by role '{}'", ctx.user_id, role);
                PermissionResult::Allowed
            }
            None => PermissionResult::Denied(format!(
                "user holds none of the required roles: {}",
                required
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}
