//! Channel implementations for messaging platforms

pub mod base;
pub mod discord;
pub mod output;

pub use base::{Channel, Transport};
pub use discord::{DiscordChannel, DiscordTransport};
pub use output::OutputRouter;
