use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use avatar_chat_core::config::{Config, LoggingConfig};
use avatar_chat_relay::{RelayState, start_relay};

mod repl;

#[derive(Parser)]
#[command(
    name = "avatar-chat",
    about = "Talk to a fortune-telling avatar that answers out loud",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the audio relay server
    Relay {
        /// Port to listen on (default: 3001)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Chat with the character (one-shot or interactive)
    Chat {
        /// Message to send (omit for interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Do not speak replies
        #[arg(long)]
        no_voice: bool,

        /// Also run the audio relay in this process
        #[arg(long)]
        with_relay: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system status
    Status,

    /// Diagnose common issues
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print the config file path
    Path,
}

/// Build the log filter: `--verbose` wins over the configured level, then
/// per-target filters are appended.
fn log_filter(logging: Option<&LoggingConfig>, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        logging
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    };

    let mut directives = vec![level.to_string()];
    if let Some(logging) = logging {
        directives.extend(logging.filters.iter().cloned());
    }
    directives.join(",")
}

fn init_logging(logging: Option<&LoggingConfig>, verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter(logging, verbose)));

    match logging.map(|l| l.format.as_str()) {
        Some("json") => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn relay_reachable(public_url: &str) -> bool {
    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
    else {
        return false;
    };
    client
        .get(format!("{public_url}/health"))
        .send()
        .await
        .is_ok_and(|r| r.status().is_success())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);

    let mut config = Config::load(&config_path)?;

    init_logging(config.logging.as_ref(), cli.verbose);

    match cli.command {
        Commands::Relay { port } => {
            if let Some(port) = port {
                config.relay.port = port;
            }
            tracing::info!(port = config.relay.port, "Starting audio relay");
            let state = Arc::new(RelayState::new(config.relay.clone())?);
            start_relay(state).await?;
        }
        Commands::Chat {
            message,
            no_voice,
            with_relay,
        } => {
            if with_relay {
                let state = Arc::new(RelayState::new(config.relay.clone())?);
                tokio::spawn(async move {
                    if let Err(e) = start_relay(state).await {
                        tracing::error!(%e, "Embedded relay stopped");
                    }
                });
            }
            repl::run(&config, message, !no_voice).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Path => {
                println!("{}", config_path.display());
            }
        },
        Commands::Status => {
            let relay_url = config.relay.public_url();
            println!("Avatar Chat v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!(
                "Chat: {} ({})",
                config.chat.provider(),
                config.chat.model()
            );
            println!(
                "Voice: {}",
                if config.voice.enabled() { "enabled" } else { "disabled" }
            );
            println!(
                "Avatar: {}",
                config
                    .avatar
                    .model_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
            println!("Relay: {relay_url}");
            println!(
                "Status: {}",
                if relay_reachable(&relay_url).await {
                    "relay running"
                } else {
                    "relay not reachable"
                }
            );
        }
        Commands::Doctor => {
            tracing::info!("Running diagnostics");
            let (warnings, errors) = config.validate();
            for warning in &warnings {
                println!("warning: {warning}");
            }
            for error in &errors {
                println!("error: {error}");
            }
            if errors.is_empty() {
                println!("Config OK ({} warning(s))", warnings.len());
            } else {
                anyhow::bail!("{} config error(s) found", errors.len());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults() {
        assert_eq!(log_filter(None, false), "info");
        assert_eq!(log_filter(None, true), "debug");
    }

    #[test]
    fn test_log_filter_from_config() {
        let logging = LoggingConfig {
            format: "json".into(),
            level: Some("warn".into()),
            filters: vec!["avatar_chat_relay=debug".into()],
        };
        assert_eq!(log_filter(Some(&logging), false), "warn,avatar_chat_relay=debug");
        assert_eq!(log_filter(Some(&logging), true), "debug,avatar_chat_relay=debug");
    }

    #[test]
    fn test_cli_parses_chat() {
        let cli = Cli::parse_from(["avatar-chat", "chat", "-m", "hello", "--no-voice"]);
        match cli.command {
            Commands::Chat {
                message, no_voice, ..
            } => {
                assert_eq!(message.as_deref(), Some("hello"));
                assert!(no_voice);
            }
            _ => panic!("expected chat command"),
        }
    }
}
