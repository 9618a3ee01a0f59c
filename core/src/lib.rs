//! cmdbot Core Library
//!
//! This library contains the command pipeline for the cmdbot Discord bot:
//! configuration, command resolution, role-based authorization, templating,
//! action dispatch, and chunked output delivery.

pub mod canary;
pub mod channels;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod messages;
pub mod rbac;
pub mod settings;
pub mod tools;

// Re-exports for convenience
pub use canary::CanaryService;
pub use channels::{Channel, DiscordChannel, OutputRouter, Transport};
pub use commands::{Action, ActionKind, CommandDefinition, CommandTable, ResolvedCommand};
pub use config::{Config, load_config};
pub use dispatch::{ActionDispatcher, Dispatched};
pub use engine::{CommandEngine, Outcome};
pub use error::*;
pub use messages::{DeliveryMode, DispatchResult, IncomingEvent, InvocationContext};
pub use rbac::{AuditLogger, RbacManager, RoleRef};
pub use settings::{Settings, SettingsStore};
