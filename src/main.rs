use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polyglot::config::Config;
use polyglot::dispatcher::{Dispatcher, TranslationRequest};
use polyglot::language::AUTO;
use polyglot::server::{self, AppState};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "polyglot")]
#[command(version, about = "Translation gateway with rate limiting, retries and fallback")]
#[command(long_about = "Forward translation requests to Gemini, OpenAI, LibreTranslate or \
    Google Translate, pacing calls against provider quotas and falling back between backends.")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Translate a single text and print the result
    Translate {
        /// Text to translate
        text: String,

        /// Target language name or code (e.g., Spanish, es)
        #[arg(short, long)]
        to: String,

        /// Source language; omit for auto-detection
        #[arg(short, long, default_value = AUTO)]
        from: String,

        /// Use only this backend, without fallback
        #[arg(short, long)]
        backend: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, finishing in-flight requests");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config
                .validate()
                .context("Configuration validation failed")?;

            let dispatcher =
                Dispatcher::from_config(&config).context("Failed to initialize backends")?;
            info!("Backends: {}", dispatcher.enabled_backends().join(", "));

            server::serve(AppState::new(dispatcher, config), shutdown_signal())
                .await
                .context("Server error")?;
        }
        Command::Translate {
            text,
            to,
            from,
            backend,
        } => {
            config
                .validate()
                .context("Configuration validation failed")?;
            let dispatcher =
                Dispatcher::from_config(&config).context("Failed to initialize backends")?;

            let mut request = TranslationRequest::new(text, &from, &to)?;
            if let Some(id) = backend {
                request = request.with_backend(id);
            }

            let result = dispatcher
                .translate(&request)
                .await
                .context("Translation failed")?;

            if let Some(detected) = &result.detected_source_language {
                info!("Detected source language: {}", detected);
            }
            info!(
                "Translated by '{}' in {} attempt(s)",
                result.backend_used, result.attempt_count
            );
            println!("{}", result.translated_text);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_translate_command() {
        let cli = Cli::try_parse_from([
            "polyglot", "translate", "--to", "es", "-b", "google", "Hello there",
        ])
        .unwrap();

        match cli.command {
            Command::Translate {
                text,
                to,
                from,
                backend,
            } => {
                assert_eq!(text, "Hello there");
                assert_eq!(to, "es");
                assert_eq!(from, "Auto");
                assert_eq!(backend.as_deref(), Some("google"));
            }
            _ => panic!("expected translate command"),
        }
    }

    #[test]
    fn test_parse_serve_with_global_flags() {
        let cli = Cli::try_parse_from(["polyglot", "serve", "--port", "9000", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Serve {
                port: Some(9000),
                ..
            }
        ));
    }

    #[test]
    fn test_translate_requires_target() {
        assert!(Cli::try_parse_from(["polyglot", "translate", "Hello"]).is_err());
    }
}
