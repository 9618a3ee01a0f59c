//! Command table, resolution and templating

pub mod resolver;
pub mod table;
pub mod template;

pub use resolver::{ResolvedCommand, raw_arguments, resolve};
pub use table::{Action, ActionKind, CommandDefinition, CommandTable, normalize_name};
pub use template::expand;
