//! Role references attached to commands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix selecting a platform (Discord) role
pub const PLATFORM_ROLE_PREFIX: &str = "discord:";

/// A role a command may require
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleRef {
    /// Matches every user
    All,
    /// Matches users listed under this name in `commandroles`
    Named(String),
    /// Matches users holding the Discord role mapped to this name in `discordroles`
    Platform(String),
}

impl RoleRef {
    /// Parse a role string (case-insensitive): `all`, `discord:<name>` or `<name>`
    pub fn parse(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        if lower == "all" {
            return RoleRef::All;
        }
        match lower.strip_prefix(PLATFORM_ROLE_PREFIX) {
            Some(name) => RoleRef::Platform(name.trim().to_string()),
            None => RoleRef::Named(lower),
        }
    }
}

impl fmt::Display for RoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleRef::All => write!(f, "all"),
            RoleRef::Named(name) => write!(f, "{}", name),
            RoleRef::Platform(name) => write!(f, "{}{}", PLATFORM_ROLE_PREFIX, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_ref() {
        assert_eq!(RoleRef::parse("all"), RoleRef::All);
        assert_eq!(RoleRef::parse(" ALL "), RoleRef::All);
        assert_eq!(RoleRef::parse("Mods"), RoleRef::Named("mods".to_string()));
        assert_eq!(
            RoleRef::parse("Discord:Moderators"),
            RoleRef::Platform("moderators".to_string())
        );
    }

    #[test]
    fn test_role_ref_display_round_trips() {
        for raw in ["all", "mods", "discord:moderators"] {
            assert_eq!(RoleRef::parse(raw).to_string(), raw);
        }
    }
}
