//! Validated runtime settings and the shared snapshot store
//!
//! The raw [`Config`] is validated once into [`Settings`]. Handlers read an
//! `Arc<Settings>` snapshot; a reload builds a complete new snapshot before
//! swapping it in, so no handler observes a partially updated table.

use crate::commands::{CommandDefinition, CommandTable, normalize_name};
use crate::config::{Config, load_config};
use crate::error::{ConfigError, Result};
use crate::rbac::{RbacManager, RoleTables};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Shell execution settings
#[derive(Debug, Clone)]
pub struct ShellSettings {
    pub enabled: bool,
    pub program: Option<String>,
    pub timeout: Duration,
}

/// Output chunking settings
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub chunk_size: usize,
    pub delimiter: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1980,
            delimiter: "\n".to_string(),
        }
    }
}

/// Canary check-in settings
#[derive(Debug, Clone)]
pub struct CanarySettings {
    pub enabled: bool,
    pub url: Option<String>,
    pub interval: Duration,
}

/// Validated settings snapshot
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: String,
    /// Lowercased command key
    pub command_key: String,
    pub table: CommandTable,
    pub rbac: RbacManager,
    pub shell: ShellSettings,
    pub file_root: PathBuf,
    pub output: OutputSettings,
    pub http_timeout: Duration,
    pub canary: CanarySettings,
}

impl Settings {
    /// Validate a raw configuration
    pub fn from_config(config: &Config) -> std::result::Result<Self, ConfigError> {
        if config.discordtoken.trim().is_empty() {
            return Err(ConfigError::Missing("discordtoken".to_string()));
        }

        let command_key = config.commandkey.trim().to_lowercase();
        if command_key.is_empty() {
            return Err(ConfigError::Missing("commandkey".to_string()));
        }
        if command_key.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "commandkey '{}' must be a single token",
                config.commandkey
            )));
        }

        let shell_program = config
            .shell
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if config.shellenable && shell_program.is_none() {
            return Err(ConfigError::Invalid(
                "if shellenable=true, a shell must be defined".to_string(),
            ));
        }

        if config.chunksize == 0 {
            return Err(ConfigError::Invalid("chunksize must be positive".to_string()));
        }

        if config.canaryenable && config.canaryurl.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Missing("canaryurl".to_string()));
        }

        let legacy_roles: BTreeMap<String, &str> = config
            .commandperms
            .iter()
            .map(|(name, role)| (normalize_name(name), role.as_str()))
            .collect();

        let mut table = CommandTable::new();
        for (name, entry) in &config.commands {
            let legacy_role = legacy_roles.get(&normalize_name(name)).copied();
            let definition = CommandDefinition::from_entry(name, entry, legacy_role)?;
            if let Some(previous) = table.insert(definition) {
                return Err(ConfigError::Invalid(format!(
                    "command '{}' is defined more than once",
                    previous.name
                )));
            }
        }

        let rbac = RbacManager::new(RoleTables::from_config(config));
        for definition in table.sorted() {
            for role in &definition.required_roles {
                if !rbac.is_role_valid(role) {
                    warn!(
                        "command '{}' requires unknown role '{}'; it will be denied",
                        definition.name, role
                    );
                }
            }
        }

        Ok(Self {
            token: config.discordtoken.trim().to_string(),
            command_key,
            table,
            rbac,
            shell: ShellSettings {
                enabled: config.shellenable,
                program: shell_program,
                timeout: Duration::from_secs(config.shelltimeout),
            },
            file_root: config.file_root(),
            output: OutputSettings {
                chunk_size: config.chunksize,
                delimiter: config.splitchar.clone(),
            },
            http_timeout: Duration::from_secs(config.httptimeout),
            canary: CanarySettings {
                enabled: config.canaryenable,
                url: config.canaryurl.clone(),
                interval: Duration::from_secs(config.canaryinterval.max(1)),
            },
        })
    }
}

/// Shared, atomically replaceable settings snapshot
pub struct SettingsStore {
    current: RwLock<Arc<Settings>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// The live snapshot
    pub async fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&*self.current.read().await)
    }

    /// Publish a new snapshot
    pub async fn replace(&self, settings: Settings) {
        *self.current.write().await = Arc::new(settings);
    }

    /// Load, validate and publish the configuration at `path`
    ///
    /// On failure the current snapshot stays live.
    pub async fn reload(&self, path: &Path) -> Result<()> {
        let config = load_config(path).await?;
        let settings = Settings::from_config(&config)?;
        let commands = settings.table.len();
        self.replace(settings).await;
        info!("reloaded {} commands from {}", commands, path.display());
        Ok(())
    }
}
