//! Built-in routines reachable through `function` commands
//!
//! Built-ins receive the raw argument text and deliver their own output; the
//! command's `secret` flag does not apply to them.

use crate::channels::{OutputRouter, Transport};
use crate::commands::Action;
use crate::error::DispatchError;
use crate::messages::{DeliveryMode, DispatchResult, InvocationContext};
use crate::settings::Settings;
use std::fmt;
use tracing::info;

/// Reply when the caller may run nothing
pub const NO_COMMANDS_REPLY: &str = "No commands available.";

/// Reply when a guild has no custom emoji
pub const NO_EMOJI_REPLY: &str = "No custom emoji.";

/// The closed set of built-in routines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `sendmessage <channel_id> <text…>`
    SendMessage,
    /// `editmessage <channel_id> <message_id> <text…>`
    EditMessage,
    /// `listemoji [guild_id]`
    ListEmoji,
    /// `listcommands`
    ListCommands,
}

impl Builtin {
    pub const ALL: [Builtin; 4] = [
        Builtin::SendMessage,
        Builtin::EditMessage,
        Builtin::ListEmoji,
        Builtin::ListCommands,
    ];

    /// Look up a built-in by its configured name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::SendMessage => "sendmessage",
            Builtin::EditMessage => "editmessage",
            Builtin::ListEmoji => "listemoji",
            Builtin::ListCommands => "listcommands",
        }
    }

    /// Run the routine with the caller's raw argument text
    pub async fn run(
        &self,
        args: &str,
        ctx: &InvocationContext,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), DispatchError> {
        match self {
            Builtin::SendMessage => {
                let (channel, text) = split_arg(args)
                    .ok_or_else(|| usage("sendmessage <channel_id> <text>"))?;
                let channel = strip_channel_mention(channel);
                if text.is_empty() {
                    return Err(usage("sendmessage <channel_id> <text>"));
                }
                transport.send_channel(channel, text).await?;
                info!("{} posted a message to channel {}", ctx.username, channel);
            }
            Builtin::EditMessage => {
                let usage_text = "editmessage <channel_id> <message_id> <text>";
                let (channel, rest) = split_arg(args).ok_or_else(|| usage(usage_text))?;
                let (message, text) = split_arg(rest).ok_or_else(|| usage(usage_text))?;
                if text.is_empty() {
                    return Err(usage(usage_text));
                }
                let channel = strip_channel_mention(channel);
                transport.edit_message(channel, message, text).await?;
                info!("{} edited message {} in channel {}", ctx.username, message, channel);
            }
            Builtin::ListEmoji => {
                let guild = args
                    .split_whitespace()
                    .next()
                    .or(ctx.guild_id.as_deref())
                    .ok_or_else(|| usage("listemoji <guild_id> (outside a server)"))?;
                let emoji = transport.list_emoji(guild).await?;
                let text = if emoji.is_empty() {
                    NO_EMOJI_REPLY.to_string()
                } else {
                    emoji.join(" ")
                };
                let result = DispatchResult::new(text, DeliveryMode::Public);
                OutputRouter::new(&settings.output)
                    .deliver(&result, ctx, transport)
                    .await;
            }
            Builtin::ListCommands => {
                let text = list_commands(settings, ctx);
                let result = DispatchResult::new(text, DeliveryMode::Private);
                OutputRouter::new(&settings.output)
                    .deliver(&result, ctx, transport)
                    .await;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One line per command the caller is authorized to run
fn list_commands(settings: &Settings, ctx: &InvocationContext) -> String {
    let lines: Vec<String> = settings
        .table
        .sorted()
        .into_iter()
        .filter(|def| !matches!(def.action, Action::Conflict(_)))
        .filter(|def| settings.rbac.authorize(&def.required_roles, ctx).is_allowed())
        .map(|def| match &def.help {
            Some(help) => format!("{} {} - {}", settings.command_key, def.name, help),
            None => format!("{} {}", settings.command_key, def.name),
        })
        .collect();

    if lines.is_empty() {
        NO_COMMANDS_REPLY.to_string()
    } else {
        lines.join("\n")
    }
}

/// Split off the first whitespace-separated argument
fn split_arg(args: &str) -> Option<(&str, &str)> {
    let args = args.trim_start();
    if args.is_empty() {
        return None;
    }
    let end = args.find(char::is_whitespace).unwrap_or(args.len());
    Some((&args[..end], args[end..].trim()))
}

/// Accept `<#123>` as well as `123`
fn strip_channel_mention(channel: &str) -> &str {
    channel
        .strip_prefix("<#")
        .and_then(|c| c.strip_suffix('>'))
        .unwrap_or(channel)
}

fn usage(text: &str) -> DispatchError {
    DispatchError::InvalidArguments(format!("usage: {}", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::base::mock::{MockTransport, Sent};
    use crate::config::{CommandEntry, CommandOptions, Config, IdValue};
    use crate::messages::IncomingEvent;

    fn settings() -> Settings {
        let mut config = Config::default();
        config.discordtoken = "token".to_string();
        config.commandkey = "!bot".to_string();
        config
            .commandroles
            .insert("mods".to_string(), vec![IdValue::Text("7".to_string())]);
        config.commands.insert(
            "help".to_string(),
            CommandEntry::Detailed(CommandOptions {
                function: Some("listcommands".to_string()),
                roles: vec!["all".to_string()],
                help: Some("List commands".to_string()),
                ..Default::default()
            }),
        );
        config.commands.insert(
            "restart".to_string(),
            CommandEntry::Detailed(CommandOptions {
                shell: Some("systemctl restart app".to_string()),
                roles: vec!["mods".to_string()],
                ..Default::default()
            }),
        );
        Settings::from_config(&config).unwrap()
    }

    fn ctx(user: &str, args: &str) -> InvocationContext {
        let event = IncomingEvent::new("!bot x", user, "alice", "100").with_guild("55");
        InvocationContext::from_event(&event, args)
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Builtin::from_name("ListEmoji"), Some(Builtin::ListEmoji));
        assert_eq!(Builtin::from_name(" sendmessage "), Some(Builtin::SendMessage));
        assert_eq!(Builtin::from_name("dance"), None);
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
    }

    #[test]
    fn test_split_arg() {
        assert_eq!(split_arg(" 123  Hello World "), Some(("123", "Hello World")));
        assert_eq!(split_arg("123"), Some(("123", "")));
        assert_eq!(split_arg("   "), None);
        assert_eq!(strip_channel_mention("<#123>"), "123");
        assert_eq!(strip_channel_mention("123"), "123");
    }

    #[tokio::test]
    async fn test_send_message_keeps_case() {
        let transport = MockTransport::new();
        Builtin::SendMessage
            .run("<#900> Hello World", &ctx("1", ""), &settings(), &transport)
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![Sent::Channel {
                channel_id: "900".to_string(),
                text: "Hello World".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_malformed_arguments_send_nothing() {
        let transport = MockTransport::new();
        let err = Builtin::SendMessage
            .run("900", &ctx("1", ""), &settings(), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));

        assert!(
            Builtin::EditMessage
                .run("900 12", &ctx("1", ""), &settings(), &transport)
                .await
                .is_err()
        );
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_edit_message() {
        let transport = MockTransport::new();
        Builtin::EditMessage
            .run("900 12 New Text", &ctx("1", ""), &settings(), &transport)
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![Sent::Edit {
                channel_id: "900".to_string(),
                message_id: "12".to_string(),
                text: "New Text".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_list_emoji_replies_in_channel() {
        let transport = MockTransport {
            emoji: vec!["<:wave:1>".to_string(), "<:ok:2>".to_string()],
            ..Default::default()
        };
        Builtin::ListEmoji
            .run("", &ctx("1", ""), &settings(), &transport)
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![Sent::Channel {
                channel_id: "100".to_string(),
                text: "<:wave:1> <:ok:2>".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_list_commands_filters_by_role() {
        let transport = MockTransport::new();
        Builtin::ListCommands
            .run("", &ctx("1", ""), &settings(), &transport)
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![Sent::Private {
                user_id: "1".to_string(),
                text: "!bot help - List commands".to_string(),
            }]
        );

        let transport = MockTransport::new();
        Builtin::ListCommands
            .run("", &ctx("7", ""), &settings(), &transport)
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![Sent::Private {
                user_id: "7".to_string(),
                text: "!bot help - List commands\n!bot restart".to_string(),
            }]
        );
    }
}
