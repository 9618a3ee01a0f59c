//! cmdbot CLI - Command-line entry point for the cmdbot Discord bot

use anyhow::{Context, Result};
use clap::Parser;
use cmdbot_core::{
    ActionDispatcher, CanaryService, Channel, CommandEngine, Config, DiscordChannel, Settings,
    SettingsStore,
    config::expand_tilde,
    load_config,
    rbac::{AuditLogger, process_audit_logs},
    tools::{HttpFetcher, ShellRunner},
};
use console::Style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// cmdbot - configurable command bot for Discord
#[derive(Parser, Debug)]
#[command(name = "cmdbot")]
#[command(version)]
#[command(about = "cmdbot - configurable command bot for Discord", long_about = None)]
struct Cli {
    /// Path to the configuration file (.yaml, .yml or .json)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Print the loaded configuration and exit
    #[arg(long)]
    displayconfig: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::builder().parse("debug")?
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path)
        .await
        .with_context(|| format!("loading {}", config_path.display()))?;

    if cli.displayconfig {
        display_config(&config);
        return Ok(());
    }

    command_run(config, config_path).await
}

/// Print every configuration key
fn display_config(config: &Config) {
    let cyan = Style::new().cyan();
    for (key, value) in config.display_entries() {
        println!("{} : {}", cyan.apply_to(key), value);
    }
}

/// Validate the configuration and run the bot until a stop signal
async fn command_run(config: Config, config_path: PathBuf) -> Result<()> {
    let green = Style::new().green();

    let settings = Settings::from_config(&config).context("invalid configuration")?;
    let store = Arc::new(SettingsStore::new(settings));
    let snapshot = store.snapshot().await;

    let dispatcher = ActionDispatcher::new(
        Arc::new(HttpFetcher::new(snapshot.http_timeout)?),
        Arc::new(ShellRunner::new()),
    );

    let (audit, audit_rx) = AuditLogger::new();
    tokio::spawn(process_audit_logs(audit_rx));

    let engine = Arc::new(CommandEngine::new(Arc::clone(&store), dispatcher, audit));

    println!(
        "{} {} commands loaded from {}",
        green.apply_to(">>>"),
        snapshot.table.len(),
        config_path.display()
    );
    if snapshot.shell.enabled {
        println!("{} Shell commands: enabled", green.apply_to(">>>"));
    }

    let canary = CanaryService::from_settings(&snapshot.canary)?;
    if canary.is_enabled() {
        println!(
            "{} Canary: every {}s",
            green.apply_to(">>>"),
            snapshot.canary.interval.as_secs()
        );
    }
    canary.start().await?;

    let discord = DiscordChannel::new(snapshot.token.clone(), engine)?;
    drop(snapshot);

    spawn_reload_listener(Arc::clone(&store), config_path);

    println!("{} Ready!", green.apply_to(">>>"));

    tokio::select! {
        result = discord.start() => {
            canary.stop().await;
            result?;
        }
        _ = shutdown_signal() => {
            println!("\nShutting down...");
            canary.stop().await;
            if discord.is_running().await {
                discord.stop().await?;
            }
        }
    }

    Ok(())
}

/// Reload the configuration on SIGHUP
#[cfg(unix)]
fn spawn_reload_listener(store: Arc<SettingsStore>, path: PathBuf) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                error!("could not listen for SIGHUP: {}", e);
                return;
            }
        };

        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading {}", path.display());
            reload(&store, &path).await;
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_listener(_store: Arc<SettingsStore>, _path: PathBuf) {}

async fn reload(store: &SettingsStore, path: &Path) {
    if let Err(e) = store.reload(path).await {
        error!("reload failed, keeping previous configuration: {}", e);
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!("could not listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
