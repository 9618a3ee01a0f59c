//! Configuration system for cmdbot
//!
//! This module loads the raw configuration file. The format follows the file
//! extension: `.yaml`/`.yml` files are parsed as YAML, `.json` files as JSON.
//! Validation into the runtime model lives in [`crate::settings`].

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// An identifier written either as a number or as a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(u64),
    Text(String),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Number(n) => write!(f, "{}", n),
            IdValue::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

/// A command entry as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandEntry {
    /// Pipe-flag string, e.g. `secret|api|http://host/{0}`
    Legacy(String),
    /// One field per action kind
    Detailed(CommandOptions),
}

/// Structured command configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandOptions {
    /// Static reply text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// URL fetched with HTTP GET
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    /// File read below the file root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Command line run through the configured shell
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Name of a built-in routine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Roles allowed to run the command (`all`, `<role>`, `discord:<role>`)
    #[serde(default)]
    pub roles: Vec<String>,
    /// Deliver the reply as a private message
    #[serde(default)]
    pub secret: bool,
    /// Help text shown by `listcommands`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Wrap the reply in a code block (defaults to true for shell commands)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codeblock: Option<bool>,
}

/// Root configuration for cmdbot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bot token from the Discord Developer Portal
    #[serde(default)]
    pub discordtoken: String,
    /// Prefix token marking a message as a command
    #[serde(default)]
    pub commandkey: String,
    /// Command name to action
    #[serde(default)]
    pub commands: BTreeMap<String, CommandEntry>,
    /// Legacy command name to required role
    #[serde(default)]
    pub commandperms: BTreeMap<String, String>,
    /// Role name to member user ids
    #[serde(default)]
    pub commandroles: BTreeMap<String, Vec<IdValue>>,
    /// Role name to Discord role id
    #[serde(default)]
    pub discordroles: BTreeMap<String, IdValue>,
    /// Whether shell commands may run
    #[serde(default)]
    pub shellenable: bool,
    /// Shell program used for shell commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Shell command timeout in seconds
    #[serde(default = "default_shell_timeout")]
    pub shelltimeout: u64,
    /// Directory file commands are confined to
    #[serde(default = "default_file_root")]
    pub fileroot: String,
    /// Maximum characters per outgoing message
    #[serde(default = "default_chunk_size")]
    pub chunksize: usize,
    /// Preferred split point for long replies
    #[serde(default = "default_split_char")]
    pub splitchar: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub httptimeout: u64,
    /// Whether the canary check-in runs
    #[serde(default)]
    pub canaryenable: bool,
    /// Canary check-in URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canaryurl: Option<String>,
    /// Canary check-in interval in seconds
    #[serde(default = "default_canary_interval")]
    pub canaryinterval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discordtoken: String::new(),
            commandkey: String::new(),
            commands: BTreeMap::new(),
            commandperms: BTreeMap::new(),
            commandroles: BTreeMap::new(),
            discordroles: BTreeMap::new(),
            shellenable: false,
            shell: None,
            shelltimeout: default_shell_timeout(),
            fileroot: default_file_root(),
            chunksize: default_chunk_size(),
            splitchar: default_split_char(),
            httptimeout: default_http_timeout(),
            canaryenable: false,
            canaryurl: None,
            canaryinterval: default_canary_interval(),
        }
    }
}

fn default_shell_timeout() -> u64 {
    60
}

fn default_file_root() -> String {
    "/".to_string()
}

fn default_chunk_size() -> usize {
    1980
}

fn default_split_char() -> String {
    "\n".to_string()
}

fn default_http_timeout() -> u64 {
    10
}

fn default_canary_interval() -> u64 {
    60
}

impl Config {
    /// Get the expanded file root
    pub fn file_root(&self) -> PathBuf {
        expand_tilde(&self.fileroot)
    }

    /// Sorted `key : value` pairs for display, with the token redacted
    pub fn display_entries(&self) -> Vec<(String, String)> {
        let value = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return Vec::new(),
        };

        let sorted: BTreeMap<String, serde_json::Value> = value.into_iter().collect();
        sorted
            .into_iter()
            .map(|(key, value)| {
                let shown = if key == "discordtoken" {
                    if self.discordtoken.is_empty() {
                        "(not set)".to_string()
                    } else {
                        "(redacted)".to_string()
                    }
                } else {
                    match value {
                        serde_json::Value::String(s) => s.escape_default().to_string(),
                        other => other.to_string(),
                    }
                };
                (key, shown)
            })
            .collect()
    }

    /// Parse configuration text in the format implied by `path`
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            serde_json::from_str(contents).map_err(ConfigError::from)?
        } else {
            serde_yaml::from_str(contents).map_err(ConfigError::from)?
        };

        Ok(config)
    }
}

/// Expand tilde in path
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Load configuration from file
pub async fn load_config(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }

    let contents = fs::read_to_string(path).await?;
    let config = Config::parse(path, &contents)?;

    tracing::debug!(
        "loaded {} commands from {}",
        config.commands.len(),
        path.display()
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_YAML: &str = r#"
discordtoken: abc123
commandkey: "!bot"
commands:
  hello: "Hello there"
  weather: "secret|api|http://wttr.in/{0}"
  uptime:
    shell: uptime
    roles: ["admin", "discord:moderators"]
    help: Show host uptime
commandperms:
  hello: all
commandroles:
  admin: [1234567890, "987"]
discordroles:
  moderators: 555000111
shellenable: true
shell: /bin/sh
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunksize, 1980);
        assert_eq!(config.splitchar, "\n");
        assert_eq!(config.shelltimeout, 60);
        assert!(!config.shellenable);
        assert!(!config.canaryenable);
    }

    #[test]
    fn test_parse_yaml_sample() {
        let config = Config::parse(Path::new("config.yaml"), SAMPLE_YAML).unwrap();
        assert_eq!(config.commandkey, "!bot");
        assert_eq!(config.commands.len(), 3);
        assert!(matches!(config.commands["hello"], CommandEntry::Legacy(_)));
        match &config.commands["uptime"] {
            CommandEntry::Detailed(options) => {
                assert_eq!(options.shell.as_deref(), Some("uptime"));
                assert_eq!(options.roles.len(), 2);
                assert!(!options.secret);
            }
            other => panic!("expected detailed entry, got {:?}", other),
        }
        let admins: Vec<String> = config.commandroles["admin"]
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(admins, vec!["1234567890", "987"]);
        assert_eq!(config.discordroles["moderators"].to_string(), "555000111");
        assert_eq!(config.chunksize, 1980);
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"discordtoken":"t","commandkey":"!k","commands":{"ping":"pong"},"chunksize":500}"#;
        let config = Config::parse(Path::new("bot.json"), json).unwrap();
        assert_eq!(config.chunksize, 500);
        assert!(config.commands.contains_key("ping"));
    }

    #[test]
    fn test_unknown_command_field_is_rejected() {
        let yaml = "commands:\n  ping:\n    mesage: pong\n";
        assert!(Config::parse(Path::new("c.yaml"), yaml).is_err());
    }

    #[test]
    fn test_display_entries_redacts_token() {
        let config = Config::parse(Path::new("config.yaml"), SAMPLE_YAML).unwrap();
        let entries = config.display_entries();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        let token = entries.iter().find(|(k, _)| k == "discordtoken").unwrap();
        assert_eq!(token.1, "(redacted)");
        assert!(entries.iter().all(|(_, v)| !v.contains("abc123")));
    }

    #[test]
    fn test_file_root_expansion() {
        let mut config = Config::default();
        config.fileroot = "~/files".to_string();
        assert!(!config.file_root().starts_with("~"));
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();

        let config = load_config(file.path()).await.unwrap();
        assert_eq!(config.discordtoken, "abc123");
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/cmdbot.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::BotError::Config(ConfigError::NotFound(_))
        ));
    }
}
