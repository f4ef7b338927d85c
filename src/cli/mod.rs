//! Command-line interface parsing and handling
//!
//! This module parses arguments, resolves settings once and dispatches to the
//! one-shot commands or the interactive session.

pub mod ask;
pub mod render;
pub mod repl;
pub mod upload;


use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::api::http::HttpBackend;
use crate::api::{Backend, BackendError};
use crate::cli::ask::run_ask;
use crate::cli::repl::run_chat;
use crate::cli::upload::run_upload;
use crate::core::config::keys::CONFIG_KEYS;
use crate::core::config::{Config, Settings};
use crate::core::constants::LOG_FILTER_ENV;
use crate::utils::logging::TranscriptLog;

#[derive(Parser)]
#[command(name = "docent")]
#[command(about = "Ask questions about your documents from the terminal")]
#[command(
    long_about = "Docent talks to a retrieval-augmented chat backend. Ask questions and get \
answers with the manual pages they came from, or upload PDF manuals for the backend to \
index.\n\n\
Environment Variables:\n\
  DOCENT_BASE_URL   Backend origin (optional, defaults to http://localhost:8000)\n\
  DOCENT_LOG        Diagnostic log filter, e.g. \"docent=debug\" (optional)\n\n\
Session commands:\n\
  /upload <paths>   Upload one or more documents\n\
  /uploads          List uploads and their status\n\
  /dismiss <id>     Remove an upload from the list\n\
  /cancel [id]      Cancel the pending answer, or an upload\n\
  /suggest [n]      List suggested questions, or ask one\n\
  /log [file]       Start or toggle the transcript log\n\
  /help             Show session commands\n\
  /quit             Leave the session"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend origin; overrides DOCENT_BASE_URL and the config file
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Enable transcript logging to the specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive session (default)
    Chat,
    /// Ask one question and print the answer with its sources
    Ask {
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
    /// Upload documents and wait until the backend has processed them
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show the stored configuration and the effective settings
    Config,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key (can be multiple words for greeting)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let base_url = args.base_url.as_deref();
    let transcript = TranscriptLog::new(args.log.as_deref().map(PathBuf::from));

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&load_settings(base_url)?, transcript).await,
        Commands::Ask { prompt } => {
            run_ask(prompt.join(" "), &load_settings(base_url)?, transcript).await
        }
        Commands::Upload { paths } => run_upload(paths, &load_settings(base_url)?).await,
        Commands::Config => {
            let config = Config::load()?;
            config.print_all();
            println!();
            match config.resolve(base_url) {
                Ok(settings) => settings.print_effective(),
                Err(err) => eprintln!("⚠️  {err}"),
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let value = value.join(" ");
            if let Err(err) = config.set_key(&key, &value) {
                eprintln!("❌ {err}");
                eprintln!("Known keys: {}", CONFIG_KEYS.join(", "));
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {key} to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            if let Err(err) = config.unset_key(&key) {
                eprintln!("❌ {err}");
                eprintln!("Known keys: {}", CONFIG_KEYS.join(", "));
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
    }
}

fn load_settings(cli_base_url: Option<&str>) -> Result<Settings, Box<dyn Error>> {
    let config = Config::load()?;
    Ok(config.resolve(cli_base_url)?)
}

/// Build the HTTP backend every command shares.
pub fn connect(settings: &Settings) -> Result<Arc<dyn Backend>, BackendError> {
    let backend = HttpBackend::new(settings.endpoints.clone(), settings.request_timeout)?;
    Ok(Arc::new(backend))
}
