//! Base channel and transport traits

use crate::error::{ChannelError, Result};
use async_trait::async_trait;

/// A chat platform connection
///
/// A channel owns the connection to a messaging platform and feeds incoming
/// messages into the command engine.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Platform name, used in logs
    fn name(&self) -> &str;

    /// Connect and handle messages until the connection ends
    async fn start(&self) -> Result<()>;

    /// Disconnect
    async fn stop(&self) -> Result<()>;

    /// Whether the platform has the credentials it needs
    fn is_enabled(&self) -> bool;
}

/// Outbound operations the command pipeline needs from a platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post `text` to a channel
    async fn send_channel(&self, channel_id: &str, text: &str) -> std::result::Result<(), ChannelError>;

    /// Open a private channel with `user_id` and post `text` to it
    ///
    /// Fails with [`ChannelError::PrivateChannelFailed`] when the private
    /// channel cannot be opened and [`ChannelError::SendFailed`] when the
    /// send itself is rejected.
    async fn send_private(&self, user_id: &str, text: &str) -> std::result::Result<(), ChannelError>;

    /// Replace the content of a message the bot posted
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        text: &str,
    ) -> std::result::Result<(), ChannelError>;

    /// Custom emoji of a guild, rendered in chat syntax
    async fn list_emoji(&self, guild_id: &str) -> std::result::Result<Vec<String>, ChannelError>;
}
