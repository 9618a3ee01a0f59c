//! Message event types passed between the transport and the command pipeline

use serde::{Deserialize, Serialize};

/// Message received from the chat platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    /// Message text content
    pub text: String,
    /// Author user identifier
    pub author_id: String,
    /// Author display name
    pub author_username: String,
    /// Channel the message arrived on
    pub channel_id: String,
    /// Guild the channel belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<String>,
    /// Whether the bot itself sent this message
    #[serde(default)]
    pub is_from_self: bool,
    /// Platform role ids held by the author (empty outside a guild)
    #[serde(default)]
    pub platform_roles: Vec<String>,
}

impl IncomingEvent {
    /// Create a new incoming event with no guild and no roles
    pub fn new(
        text: impl Into<String>,
        author_id: impl Into<String>,
        author_username: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            author_id: author_id.into(),
            author_username: author_username.into(),
            channel_id: channel_id.into(),
            guild_id: None,
            is_from_self: false,
            platform_roles: Vec::new(),
        }
    }

    /// Set the guild id
    pub fn with_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Set the author's platform roles
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.platform_roles = roles;
        self
    }
}

/// Per-invocation context handed to the authorizer and dispatcher
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub raw_text: String,
    /// Text after the command key and the matched command name, original case
    pub arguments: String,
    pub user_id: String,
    pub username: String,
    pub platform_roles: Vec<String>,
    pub channel_id: String,
    pub guild_id: Option<String>,
}

impl InvocationContext {
    /// Build the context for an event
    pub fn from_event(event: &IncomingEvent, arguments: impl Into<String>) -> Self {
        Self {
            raw_text: event.text.clone(),
            arguments: arguments.into(),
            user_id: event.author_id.clone(),
            username: event.author_username.clone(),
            platform_roles: event.platform_roles.clone(),
            channel_id: event.channel_id.clone(),
            guild_id: event.guild_id.clone(),
        }
    }
}

/// Where a reply is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// The channel the command arrived on
    Public,
    /// A private channel opened with the invoking user
    Private,
}

impl DeliveryMode {
    pub fn from_secret(secret: bool) -> Self {
        if secret {
            DeliveryMode::Private
        } else {
            DeliveryMode::Public
        }
    }
}

/// Output of a dispatched action, ready for the output router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub output_text: String,
    pub delivery_mode: DeliveryMode,
    /// Wrap every chunk in a code block
    pub codeblock: bool,
}

impl DispatchResult {
    pub fn new(output_text: impl Into<String>, delivery_mode: DeliveryMode) -> Self {
        Self {
            output_text: output_text.into(),
            delivery_mode,
            codeblock: false,
        }
    }

    pub fn with_codeblock(mut self, codeblock: bool) -> Self {
        self.codeblock = codeblock;
        self
    }
}
