//! Role tables built from configuration

use crate::config::Config;
use std::collections::{HashMap, HashSet};

/// Configured role memberships
#[derive(Debug, Clone, Default)]
pub struct RoleTables {
    /// Role name -> member user ids
    pub named: HashMap<String, HashSet<String>>,
    /// Role name -> Discord role id
    pub platform: HashMap<String, String>,
}

impl RoleTables {
    /// Build role tables from the raw configuration (role names are lowercased)
    pub fn from_config(config: &Config) -> Self {
        let named = config
            .commandroles
            .iter()
            .map(|(name, members)| {
                (
                    name.trim().to_lowercase(),
                    members.iter().map(|id| id.to_string()).collect(),
                )
            })
            .collect();

        let platform = config
            .discordroles
            .iter()
            .map(|(name, id)| (name.trim().to_lowercase(), id.to_string()))
            .collect();

        Self { named, platform }
    }

    /// Add a member to a named role
    pub fn add_member(&mut self, role: &str, user_id: impl Into<String>) {
        self.named
            .entry(role.to_lowercase())
            .or_default()
            .insert(user_id.into());
    }

    /// Map a platform role name to its id
    pub fn add_platform_role(&mut self, name: &str, role_id: impl Into<String>) {
        self.platform.insert(name.to_lowercase(), role_id.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdValue;

    #[test]
    fn test_from_config_normalizes_names_and_ids() {
        let mut config = Config::default();
        config.commandroles.insert(
            "Admins".to_string(),
            vec![IdValue::Number(42), IdValue::Text(" 43 ".to_string())],
        );
        config
            .discordroles
            .insert("Mods".to_string(), IdValue::Number(9000));

        let tables = RoleTables::from_config(&config);
        let admins = &tables.named["admins"];
        assert!(admins.contains("42"));
        assert!(admins.contains("43"));
        assert_eq!(tables.platform["mods"], "9000");
    }
}
