//! Action dispatch: run a resolved, authorized command's action

use crate::channels::Transport;
use crate::commands::{Action, CommandDefinition, table::join_kinds};
use crate::error::DispatchError;
use crate::messages::{DeliveryMode, DispatchResult, InvocationContext};
use crate::settings::Settings;
use crate::tools::{Builtin, CommandRunner, Fetcher, read_rooted};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Reply sent when an api command cannot fetch its URL
pub const API_FAILURE_REPLY: &str = "Could not retrieve a response";

/// What a dispatch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Output for the output router
    Reply(DispatchResult),
    /// The action ran but produced nothing to send
    Empty,
    /// A built-in ran and delivered its own output
    Handled(Builtin),
}

/// Runs actions through the HTTP and process collaborators
#[derive(Clone)]
pub struct ActionDispatcher {
    fetcher: Arc<dyn Fetcher>,
    runner: Arc<dyn CommandRunner>,
}

impl ActionDispatcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { fetcher, runner }
    }

    /// Run `definition` with its template already expanded to `expanded`
    ///
    /// Errors mean nothing is sent to the user; the caller logs them.
    pub async fn dispatch(
        &self,
        definition: &CommandDefinition,
        expanded: &str,
        ctx: &InvocationContext,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<Dispatched, DispatchError> {
        let mode = DeliveryMode::from_secret(definition.secret);
        let reply = |text: String| {
            if text.trim().is_empty() {
                debug!("command '{}' produced no output", definition.name);
                return Dispatched::Empty;
            }
            Dispatched::Reply(DispatchResult::new(text, mode).with_codeblock(definition.codeblock))
        };

        match &definition.action {
            Action::Conflict(kinds) => Err(DispatchError::Conflict {
                command: definition.name.clone(),
                kinds: join_kinds(kinds),
            }),

            Action::Message(_) => Ok(reply(expanded.to_string())),

            Action::ApiCall(_) => match self.fetcher.fetch(expanded).await {
                Ok(body) => Ok(reply(body)),
                Err(e) => {
                    warn!("api command '{}' failed: {}", definition.name, e);
                    Ok(reply(API_FAILURE_REPLY.to_string()))
                }
            },

            Action::File(_) => {
                let contents = read_rooted(&settings.file_root, expanded).await?;
                Ok(reply(contents))
            }

            Action::Shell(_) => {
                let program = match (&settings.shell.program, settings.shell.enabled) {
                    (Some(program), true) => program,
                    _ => return Err(DispatchError::ShellDisabled),
                };

                let output = self
                    .runner
                    .run(program, expanded, settings.shell.timeout)
                    .await;
                if let Some(e) = &output.error {
                    error!("shell command \"{}\" failed: {}", expanded, e);
                }

                match output.render() {
                    Some(text) => Ok(reply(text)),
                    None => {
                        debug!("shell command \"{}\" produced no output", expanded);
                        Ok(Dispatched::Empty)
                    }
                }
            }

            Action::Function(name) => {
                let builtin =
                    Builtin::from_name(name).ok_or_else(|| DispatchError::UnknownFunction(name.clone()))?;
                builtin.run(&ctx.arguments, ctx, settings, transport).await?;
                Ok(Dispatched::Handled(builtin))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{MockFetcher, MockRunner};
    use super::*;
    use crate::channels::base::mock::MockTransport;
    use crate::config::{CommandEntry, Config};
    use crate::messages::IncomingEvent;
    use crate::tools::ShellOutput;

    fn settings(shell_enabled: bool) -> Settings {
        let mut config = Config::default();
        config.discordtoken = "token".to_string();
        config.commandkey = "!bot".to_string();
        config.shellenable = shell_enabled;
        config.shell = Some("/bin/sh".to_string());
        Settings::from_config(&config).unwrap()
    }

    fn definition(raw: &str) -> CommandDefinition {
        CommandDefinition::from_entry("cmd", &CommandEntry::Legacy(raw.to_string()), Some("all"))
            .unwrap()
    }

    fn ctx(arguments: &str) -> InvocationContext {
        InvocationContext::from_event(&IncomingEvent::new("!bot cmd", "1", "alice", "100"), arguments)
    }

    fn dispatcher(fetcher: MockFetcher, runner: MockRunner) -> ActionDispatcher {
        ActionDispatcher::new(Arc::new(fetcher), Arc::new(runner))
    }

    #[tokio::test]
    async fn test_message_is_verbatim() {
        let d = dispatcher(MockFetcher::default(), MockRunner::default());
        let out = d
            .dispatch(&definition("secret|Hi {0}"), "Hi bob", &ctx(""), &settings(false), &MockTransport::new())
            .await
            .unwrap();
        assert_eq!(
            out,
            Dispatched::Reply(DispatchResult::new("Hi bob", DeliveryMode::Private))
        );
    }

    #[tokio::test]
    async fn test_api_success_and_failure() {
        let d = dispatcher(MockFetcher::with("http://wttr.in/paris", "sunny"), MockRunner::default());
        let def = definition("api|http://wttr.in/{0}");
        let transport = MockTransport::new();

        let out = d
            .dispatch(&def, "http://wttr.in/paris", &ctx(""), &settings(false), &transport)
            .await
            .unwrap();
        assert_eq!(out, Dispatched::Reply(DispatchResult::new("sunny", DeliveryMode::Public)));

        let out = d
            .dispatch(&def, "http://wttr.in/mars", &ctx(""), &settings(false), &transport)
            .await
            .unwrap();
        assert_eq!(
            out,
            Dispatched::Reply(DispatchResult::new(API_FAILURE_REPLY, DeliveryMode::Public))
        );
    }

    #[tokio::test]
    async fn test_blank_results_send_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty"), "").unwrap();
        let mut settings = settings(false);
        settings.file_root = dir.path().to_path_buf();

        let d = dispatcher(MockFetcher::with("http://blank", "  \n"), MockRunner::default());
        let transport = MockTransport::new();

        let cases = [
            (definition("{0}"), ""),
            (definition("api|{0}"), "http://blank"),
            (definition("file|{0}"), "empty"),
        ];
        for (def, expanded) in &cases {
            let out = d
                .dispatch(def, expanded, &ctx(""), &settings, &transport)
                .await
                .unwrap();
            assert_eq!(out, Dispatched::Empty);
        }
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_runs_nothing() {
        let fetcher = MockFetcher::with("/etc/motd", "body");
        let d = ActionDispatcher::new(Arc::new(fetcher), Arc::new(MockRunner::default()));
        let err = d
            .dispatch(&definition("api|file|/etc/motd"), "/etc/motd", &ctx(""), &settings(true), &MockTransport::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_file_read_is_rooted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("motd"), "welcome").unwrap();
        let mut settings = settings(false);
        settings.file_root = dir.path().to_path_buf();

        let d = dispatcher(MockFetcher::default(), MockRunner::default());
        let def = definition("file|{0}");
        let out = d
            .dispatch(&def, "../../motd", &ctx(""), &settings, &MockTransport::new())
            .await
            .unwrap();
        assert_eq!(out, Dispatched::Reply(DispatchResult::new("welcome", DeliveryMode::Public)));

        assert!(matches!(
            d.dispatch(&def, "nope", &ctx(""), &settings, &MockTransport::new()).await,
            Err(DispatchError::File(_))
        ));
    }

    #[tokio::test]
    async fn test_shell_disabled_is_refused() {
        let runner = Arc::new(MockRunner {
            output: ShellOutput {
                stdout: "should not run".to_string(),
                ..Default::default()
            },
            ..Default::default()
        });
        let d = ActionDispatcher::new(Arc::new(MockFetcher::default()), runner.clone());
        let err = d
            .dispatch(&definition("shell|uptime"), "uptime", &ctx(""), &settings(false), &MockTransport::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ShellDisabled));
        assert!(runner.ran.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shell_output_and_empty_output() {
        let runner = MockRunner {
            output: ShellOutput {
                stdout: " 10:00 up 3 days\n".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let d = dispatcher(MockFetcher::default(), runner);
        let out = d
            .dispatch(&definition("shell|uptime"), "uptime", &ctx(""), &settings(true), &MockTransport::new())
            .await
            .unwrap();
        assert_eq!(
            out,
            Dispatched::Reply(
                DispatchResult::new(" 10:00 up 3 days\n", DeliveryMode::Public).with_codeblock(true)
            )
        );

        let d = dispatcher(MockFetcher::default(), MockRunner::default());
        let out = d
            .dispatch(&definition("shell|true"), "true", &ctx(""), &settings(true), &MockTransport::new())
            .await
            .unwrap();
        assert_eq!(out, Dispatched::Empty);
    }

    #[tokio::test]
    async fn test_function_dispatch() {
        let d = dispatcher(MockFetcher::default(), MockRunner::default());
        let transport = MockTransport::new();

        let out = d
            .dispatch(&definition("function|sendmessage"), "sendmessage", &ctx("5 Hi"), &settings(false), &transport)
            .await
            .unwrap();
        assert_eq!(out, Dispatched::Handled(Builtin::SendMessage));
        assert_eq!(transport.sent().len(), 1);

        let err = d
            .dispatch(&definition("function|dance"), "dance", &ctx(""), &settings(false), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownFunction(_)));
    }
}
