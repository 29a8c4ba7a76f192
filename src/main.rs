//! chat-relay - minimal chat relay for an LLM chat-completion API
//!
//! Accepts `{"message": ...}` on POST /api/chat, forwards it to the
//! upstream, and returns `{"response": ...}` or `{"error": ...}`.

use std::path::PathBuf;

use chat_relay::config::{Config, KeySource};
use chat_relay::proxy::run_server;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(about = "Minimal chat relay for an LLM chat-completion API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Optional TOML configuration file; environment variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and show the resolved settings
    Check {
        /// Optional TOML configuration file; environment variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("chat_relay={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let (mut config, key_source) = Config::load(config.as_deref())?;
            init_tracing(&config.logging.level);

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            tracing::info!(
                upstream = %config.upstream.url,
                model = %config.upstream.model,
                fallback = ?config.upstream.fallback_model,
                key_source = %key_source,
                "Loaded configuration"
            );

            run_server(config).await
        }

        Commands::Check { config } => {
            let (config, key_source) = Config::load(config.as_deref())?;

            println!("Configuration OK");
            println!("  API key source: {}", key_source);
            if key_source == KeySource::None {
                println!("  warning: GROK_API_KEY is not set, /api requests will be rejected");
            }
            if let (Some(fallback), None) = (
                config.upstream.fallback_model.as_deref(),
                config.upstream.effective_fallback(),
            ) {
                println!(
                    "  warning: fallback model '{}' equals the primary model and will never be used",
                    fallback
                );
            }
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
