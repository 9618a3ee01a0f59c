//! Role-Based Access Control (RBAC) for commands
//!
//! Commands list the roles allowed to run them. A role reference is either the
//! wildcard `all`, a named role backed by a list of user ids, or a Discord role
//! resolved through a name to role-id mapping.

pub mod audit;
pub mod config;
pub mod manager;
pub mod role;


pub use audit::{AuditLogEntry, AuditLogger, Decision, process_audit_logs};
pub use config::RoleTables;
pub use manager::{PermissionResult, RbacManager};
pub use role::RoleRef;
