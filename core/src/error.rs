//! Error types for cmdbot

use std::path::PathBuf;
use thiserror::Error;

/// Result type for cmdbot operations
pub type Result<T> = std::result::Result<T, BotError>;

/// Main error type for cmdbot
#[derive(Error, Debug)]
pub enum BotError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Anything surfaced through anyhow
    #[error("{0}")]
    Other(String),
}

/// Problems loading or validating the bot configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no configuration file at {0}")]
    NotFound(PathBuf),

    #[error("could not parse configuration: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("required key missing: {0}")]
    Missing(String),
}

/// Errors raised while executing a command's action
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Conflicting action kinds on command '{command}': {kinds}")]
    Conflict { command: String, kinds: String },

    #[error("Shell execution is disabled")]
    ShellDisabled,

    #[error("File error: {0}")]
    File(String),

    #[error("Shell error: {0}")]
    Shell(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] ChannelError),
}

/// Failures talking to the chat platform
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("platform not configured: {0}")]
    NotConfigured(String),

    #[error("message rejected: {0}")]
    SendFailed(String),

    #[error("Failed to open private channel to {0}")]
    PrivateChannelFailed(String),

    #[error("platform connection failed: {0}")]
    ConnectionFailed(String),

    #[error("platform request failed: {0}")]
    RequestFailed(String),
}

impl From<anyhow::Error> for BotError {
    fn from(err: anyhow::Error) -> Self {
        BotError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(format!("YAML error: {}", err))
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Fetch(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::UnknownFunction("dance".to_string());
        assert_eq!(err.to_string(), "Unknown function: dance");
    }

    #[test]
    fn test_error_conversion() {
        let bot_err: BotError = std::io::Error::other("disk gone").into();
        assert!(matches!(bot_err, BotError::Io(_)));

        let cfg_err: BotError = ConfigError::Missing("commandkey".to_string()).into();
        assert_eq!(
            cfg_err.to_string(),
            "config: required key missing: commandkey"
        );
    }
}
