//! discord channel using serenity (through poise's prelude)

use super::base::{Channel, Transport};
use crate::engine::{CommandEngine, strip_command_key};
use crate::error::{ChannelError, Result};
use crate::messages::IncomingEvent;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// parse a discord snowflake; zero is rejected because serenity ids panic on it
fn parse_id(kind: &str, raw: &str) -> std::result::Result<u64, ChannelError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ChannelError::SendFailed(format!("invalid discord {} id: {}", kind, raw))),
    }
}

/// outbound operations over serenity's http client
#[derive(Clone)]
pub struct DiscordTransport {
    http: Arc<serenity::Http>,
}

impl DiscordTransport {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    async fn send_channel(&self, channel_id: &str, text: &str) -> std::result::Result<(), ChannelError> {
        let channel = serenity::ChannelId::new(parse_id("channel", channel_id)?);
        channel
            .say(&*self.http, text)
            .await
            .map(|_| debug!("sent message to discord channel {}", channel_id))
            .map_err(|e| ChannelError::SendFailed(format!("channel {}: {}", channel_id, e)))
    }

    async fn send_private(&self, user_id: &str, text: &str) -> std::result::Result<(), ChannelError> {
        let user = serenity::UserId::new(
            parse_id("user", user_id)
                .map_err(|_| ChannelError::PrivateChannelFailed(user_id.to_string()))?,
        );

        let dm = user.create_dm_channel(&*self.http).await.map_err(|e| {
            error!("could not open dm with {}: {}", user_id, e);
            ChannelError::PrivateChannelFailed(user_id.to_string())
        })?;

        dm.id
            .say(&*self.http, text)
            .await
            .map(|_| debug!("sent private message to {}", user_id))
            .map_err(|e| ChannelError::SendFailed(format!("dm to {}: {}", user_id, e)))
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        text: &str,
    ) -> std::result::Result<(), ChannelError> {
        let channel = serenity::ChannelId::new(parse_id("channel", channel_id)?);
        let message = serenity::MessageId::new(parse_id("message", message_id)?);

        channel
            .edit_message(&*self.http, message, serenity::EditMessage::new().content(text))
            .await
            .map(|_| ())
            .map_err(|e| {
                ChannelError::SendFailed(format!("edit {} in {}: {}", message_id, channel_id, e))
            })
    }

    async fn list_emoji(&self, guild_id: &str) -> std::result::Result<Vec<String>, ChannelError> {
        let guild = serenity::GuildId::new(
            parse_id("guild", guild_id).map_err(|e| ChannelError::RequestFailed(e.to_string()))?,
        );

        let emojis = guild
            .emojis(&*self.http)
            .await
            .map_err(|e| ChannelError::RequestFailed(format!("emoji for guild {}: {}", guild_id, e)))?;

        Ok(emojis.iter().map(|emoji| emoji.to_string()).collect())
    }
}

/// discord channel feeding messages to the command engine
pub struct DiscordChannel {
    token: String,
    engine: Arc<CommandEngine>,
    running: Arc<RwLock<bool>>,
    shard_manager: Arc<RwLock<Option<Arc<serenity::ShardManager>>>>,
}

impl DiscordChannel {
    /// create new discord channel
    pub fn new(token: impl Into<String>, engine: Arc<CommandEngine>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ChannelError::NotConfigured("Discord".to_string()).into());
        }

        Ok(Self {
            token,
            engine,
            running: Arc::new(RwLock::new(false)),
            shard_manager: Arc::new(RwLock::new(None)),
        })
    }

    /// Whether the gateway client is connected
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// get user roles from the guild member, empty outside a guild
    async fn get_user_roles(
        guild_id: Option<serenity::GuildId>,
        http: &serenity::Http,
        user_id: serenity::UserId,
    ) -> Vec<String> {
        if let Some(gid) = guild_id
            && let Ok(member) = gid.member(http, user_id).await
        {
            return member.roles.iter().map(|r| r.to_string()).collect();
        }
        Vec::new()
    }
}

struct MessageHandler {
    engine: Arc<CommandEngine>,
    bot_id: Arc<RwLock<Option<serenity::UserId>>>,
}

#[serenity::async_trait]
impl serenity::EventHandler for MessageHandler {
    async fn message(&self, ctx: serenity::Context, new_message: serenity::Message) {
        let is_from_self = *self.bot_id.read().await == Some(new_message.author.id);
        if is_from_self {
            return;
        }

        // only look up member roles for messages addressed to the bot
        let settings = self.engine.settings().snapshot().await;
        if strip_command_key(&new_message.content, &settings.command_key).is_none() {
            return;
        }
        drop(settings);

        let roles =
            DiscordChannel::get_user_roles(new_message.guild_id, &ctx.http, new_message.author.id)
                .await;

        let mut event = IncomingEvent::new(
            new_message.content.clone(),
            new_message.author.id.to_string(),
            new_message.author.name.clone(),
            new_message.channel_id.to_string(),
        )
        .with_roles(roles);
        if let Some(guild_id) = new_message.guild_id {
            event = event.with_guild(guild_id.to_string());
        }

        let transport = DiscordTransport::new(Arc::clone(&ctx.http));
        let outcome = self.engine.handle(&event, &transport).await;
        debug!("message {} handled: {:?}", new_message.id, outcome);
    }

    async fn ready(&self, _ctx: serenity::Context, ready: serenity::Ready) {
        info!("discord bot connected as {}", ready.user.name);
        *self.bot_id.write().await = Some(ready.user.id);
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> Result<()> {
        *self.running.write().await = true;

        info!("starting discord bot");

        let intents = serenity::GatewayIntents::GUILD_MESSAGES
            | serenity::GatewayIntents::DIRECT_MESSAGES
            | serenity::GatewayIntents::MESSAGE_CONTENT;

        let handler = MessageHandler {
            engine: Arc::clone(&self.engine),
            bot_id: Arc::new(RwLock::new(None)),
        };

        let mut client = serenity::ClientBuilder::new(&self.token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("discord client error: {}", e)))?;

        *self.shard_manager.write().await = Some(Arc::clone(&client.shard_manager));

        info!("discord bot started, waiting for messages...");
        let result = client.start().await.map_err(|e| {
            error!("discord client error: {}", e);
            ChannelError::ConnectionFailed(format!("discord client error: {}", e))
        });

        *self.running.write().await = false;
        result?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        *self.running.write().await = false;
        info!("stopping discord bot");
        if let Some(manager) = self.shard_manager.write().await.take() {
            manager.shutdown_all().await;
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        !self.token.trim().is_empty()
    }
}
