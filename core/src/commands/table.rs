//! Command definitions and the command table

use crate::config::{CommandEntry, CommandOptions};
use crate::error::ConfigError;
use crate::rbac::RoleRef;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// The kinds of action a command can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Message,
    Api,
    File,
    Shell,
    Function,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Message => "message",
            ActionKind::Api => "api",
            ActionKind::File => "file",
            ActionKind::Shell => "shell",
            ActionKind::Function => "function",
        }
    }

    /// Flag names usable in the legacy pipe encoding
    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "api" => Some(ActionKind::Api),
            "file" => Some(ActionKind::File),
            "shell" => Some(ActionKind::Shell),
            "function" => Some(ActionKind::Function),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a command does when invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Message(String),
    ApiCall(String),
    File(String),
    Shell(String),
    Function(String),
    /// More than one action kind configured; never executed
    Conflict(Vec<ActionKind>),
}

impl Action {
    fn from_kind(kind: ActionKind, payload: String) -> Self {
        match kind {
            ActionKind::Message => Action::Message(payload),
            ActionKind::Api => Action::ApiCall(payload),
            ActionKind::File => Action::File(payload),
            ActionKind::Shell => Action::Shell(payload),
            ActionKind::Function => Action::Function(payload.trim().to_lowercase()),
        }
    }

    pub fn kind(&self) -> Option<ActionKind> {
        match self {
            Action::Message(_) => Some(ActionKind::Message),
            Action::ApiCall(_) => Some(ActionKind::Api),
            Action::File(_) => Some(ActionKind::File),
            Action::Shell(_) => Some(ActionKind::Shell),
            Action::Function(_) => Some(ActionKind::Function),
            Action::Conflict(_) => None,
        }
    }

    /// The text positional arguments are substituted into
    pub fn template(&self) -> Option<&str> {
        match self {
            Action::Message(t) | Action::ApiCall(t) | Action::File(t) | Action::Shell(t) => {
                Some(t)
            }
            Action::Function(_) | Action::Conflict(_) => None,
        }
    }
}

/// A configured command
#[derive(Debug, Clone)]
pub struct CommandDefinition {
    /// Lowercase tokens joined by single spaces
    pub name: String,
    pub action: Action,
    pub required_roles: Vec<RoleRef>,
    pub secret: bool,
    pub help: Option<String>,
    pub codeblock: bool,
}

impl CommandDefinition {
    /// Build a definition from a configuration entry
    ///
    /// `legacy_role` is the `commandperms` entry for this command, if any.
    pub fn from_entry(
        name: &str,
        entry: &CommandEntry,
        legacy_role: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(ConfigError::Invalid("empty command name".to_string()));
        }

        let (action, mut roles, secret, help, codeblock) = match entry {
            CommandEntry::Legacy(raw) => {
                let (action, secret) = parse_legacy(raw);
                (action, Vec::new(), secret, None, None)
            }
            CommandEntry::Detailed(options) => (
                detailed_action(options),
                options.roles.iter().map(|r| RoleRef::parse(r)).collect::<Vec<_>>(),
                options.secret,
                options.help.clone(),
                options.codeblock,
            ),
        };

        if let Some(role) = legacy_role {
            let role = RoleRef::parse(role);
            if !roles.contains(&role) {
                roles.push(role);
            }
        }

        let action = match action {
            Some(action) => action,
            None => {
                return Err(ConfigError::Invalid(format!(
                    "command '{}' has no action configured",
                    name
                )));
            }
        };

        if let Action::Conflict(kinds) = &action {
            warn!(
                "command '{}' configures more than one action kind ({}); it will never run",
                name,
                join_kinds(kinds)
            );
        }

        if roles.is_empty() {
            warn!("command '{}' has no roles; it will be denied for everyone", name);
        }

        let codeblock = codeblock.unwrap_or(matches!(action, Action::Shell(_)));

        Ok(Self {
            name,
            action,
            required_roles: roles,
            secret,
            help,
            codeblock,
        })
    }
}

/// Join action kinds for messages, e.g. "api, file"
pub fn join_kinds(kinds: &[ActionKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lowercase a command name and collapse its whitespace
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse `flag|flag|payload`; returns the action and the secret flag
fn parse_legacy(raw: &str) -> (Option<Action>, bool) {
    let mut secret = false;
    let mut kinds = Vec::new();
    let mut payload = Vec::new();

    for part in raw.split('|') {
        if part == "secret" {
            secret = true;
        } else if let Some(kind) = ActionKind::from_flag(part) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        } else {
            payload.push(part);
        }
    }

    let payload = payload.join("|");
    let action = match kinds.as_slice() {
        [] if payload.is_empty() => None,
        [] => Some(Action::Message(payload)),
        [kind] => Some(Action::from_kind(*kind, payload)),
        _ => {
            kinds.sort();
            Some(Action::Conflict(kinds))
        }
    };

    (action, secret)
}

fn detailed_action(options: &CommandOptions) -> Option<Action> {
    let configured: Vec<(ActionKind, &String)> = [
        (ActionKind::Message, options.message.as_ref()),
        (ActionKind::Api, options.api.as_ref()),
        (ActionKind::File, options.file.as_ref()),
        (ActionKind::Shell, options.shell.as_ref()),
        (ActionKind::Function, options.function.as_ref()),
    ]
    .into_iter()
    .filter_map(|(kind, value)| value.map(|v| (kind, v)))
    .collect();

    match configured.as_slice() {
        [] => None,
        [(kind, payload)] => Some(Action::from_kind(*kind, (*payload).clone())),
        many => Some(Action::Conflict(many.iter().map(|(k, _)| *k).collect())),
    }
}

/// Immutable mapping from command name to definition
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: HashMap<String, CommandDefinition>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, returning the one it replaced
    pub fn insert(&mut self, definition: CommandDefinition) -> Option<CommandDefinition> {
        self.commands.insert(definition.name.clone(), definition)
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Definitions sorted by name
    pub fn sorted(&self) -> Vec<&CommandDefinition> {
        let mut all: Vec<_> = self.commands.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
