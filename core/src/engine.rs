//! Command engine
//!
//! Runs one incoming message through the whole pipeline:
//! resolve, authorize, expand, dispatch, deliver. Each call takes its own
//! settings snapshot, so a reload never changes the table mid-invocation.

use crate::channels::{OutputRouter, Transport};
use crate::commands::{expand, raw_arguments, resolve};
use crate::dispatch::{ActionDispatcher, Dispatched};
use crate::messages::{DeliveryMode, IncomingEvent, InvocationContext};
use crate::rbac::{AuditLogger, PermissionResult};
use crate::settings::SettingsStore;
use crate::tools::Builtin;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How an incoming message was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Sent by the bot, or not addressed to it
    Ignored,
    /// Addressed to the bot but no command matched
    NotFound,
    /// The caller lacks every required role
    Denied,
    /// The action was refused or failed without a reply
    Refused,
    /// The action ran and had nothing to say
    Silent,
    /// Output was sent in `chunks` pieces
    Delivered { chunks: usize, mode: DeliveryMode },
    /// A built-in routine handled its own output
    Builtin(Builtin),
}

/// Strip the command key from `text`
///
/// The message must open with the key (case-insensitive) followed by a
/// single space, and have something after it.
pub fn strip_command_key<'a>(text: &'a str, command_key: &str) -> Option<&'a str> {
    let prefix = text.get(..command_key.len())?;
    if prefix.to_lowercase() != command_key {
        return None;
    }
    let body = text[command_key.len()..].strip_prefix(' ')?.trim();
    (!body.is_empty()).then_some(body)
}

/// Handles incoming messages against the live settings
pub struct CommandEngine {
    settings: Arc<SettingsStore>,
    dispatcher: ActionDispatcher,
    audit: AuditLogger,
}

impl CommandEngine {
    pub fn new(settings: Arc<SettingsStore>, dispatcher: ActionDispatcher, audit: AuditLogger) -> Self {
        Self {
            settings,
            dispatcher,
            audit,
        }
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// Handle one incoming message
    pub async fn handle(&self, event: &IncomingEvent, transport: &dyn Transport) -> Outcome {
        if event.is_from_self {
            return Outcome::Ignored;
        }

        let settings = self.settings.snapshot().await;

        let Some(body) = strip_command_key(&event.text, &settings.command_key) else {
            return Outcome::Ignored;
        };

        info!(
            "User:{} ID:{} Command:\"{}\"",
            event.author_username, event.author_id, event.text
        );

        let lowered = body.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();
        let Some(resolved) = resolve(&tokens, &settings.table) else {
            debug!(
                "User:{} ID:{} Command:\"{}\" Status:\"Command is invalid\"",
                event.author_username, event.author_id, event.text
            );
            return Outcome::NotFound;
        };
        let definition = resolved.definition;

        let ctx = InvocationContext::from_event(event, raw_arguments(body, resolved.consumed));

        let permission = settings.rbac.authorize(&definition.required_roles, &ctx);
        self.audit.log(&ctx, &definition.name, &permission);
        if let PermissionResult::Denied(reason) = permission {
            warn!(
                "User:{} ID:{} may not run command \"{}\": {}",
                ctx.username, ctx.user_id, definition.name, reason
            );
            return Outcome::Denied;
        }

        let expanded = definition
            .action
            .template()
            .map(|template| expand(template, &resolved.args))
            .unwrap_or_default();

        match self
            .dispatcher
            .dispatch(definition, &expanded, &ctx, &settings, transport)
            .await
        {
            Ok(Dispatched::Reply(result)) => {
                let outcomes = OutputRouter::new(&settings.output)
                    .deliver(&result, &ctx, transport)
                    .await;
                Outcome::Delivered {
                    chunks: outcomes.len(),
                    mode: result.delivery_mode,
                }
            }
            Ok(Dispatched::Empty) => Outcome::Silent,
            Ok(Dispatched::Handled(builtin)) => Outcome::Builtin(builtin),
            Err(e) => {
                error!("command \"{}\" not run: {}", definition.name, e);
                Outcome::Refused
            }
        }
    }
}
