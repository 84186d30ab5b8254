//! Binary entry point for folio.
//!
//! This binary serves the portfolio HTTP API and offers a few maintenance commands.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand, ValueEnum};
use folio::config::FolioConfig;
use folio::llm::{GeminiClient, LlmHttpConfig, LlmProvider};
use folio::models::{ContentItem, ItemView};
use folio::observability::{self, ObservabilityConfig};
use folio::server::{self, AppState};
use folio::services::{ContentStore, QaGateway};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Folio - portfolio content server with a grounded AI question endpoint.
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Bind host (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List loaded content items.
    Items {
        /// Which items to list.
        #[arg(short, long, value_enum, default_value_t = ItemKind::All)]
        kind: ItemKind,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Ask one grounded question from the terminal.
    Ask {
        /// Item id.
        item_id: String,

        /// The question.
        query: String,
    },

    /// Show the effective configuration.
    Config {
        /// Print the full configuration (API key redacted).
        #[arg(long)]
        show: bool,
    },
}

/// Item filter for `items`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ItemKind {
    /// Projects and papers.
    All,
    /// Projects only.
    Projects,
    /// Research papers only.
    Research,
}

fn main() -> ExitCode {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if !matches!(cli.command, Commands::Serve { .. }) {
        config.metrics.enabled = false;
    }

    let _observability =
        match observability::init(&ObservabilityConfig::from_config(&config, cli.verbose)) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("Failed to initialize observability: {e}");
                return ExitCode::FAILURE;
            },
        };

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration from an explicit path or the default locations, then env.
fn load_config(path: Option<&Path>) -> folio::Result<FolioConfig> {
    let config = match path {
        Some(path) => FolioConfig::load_from_file(path)?,
        None => FolioConfig::load_default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Runs the selected command.
fn run_command(command: Commands, config: FolioConfig) -> folio::Result<()> {
    match command {
        Commands::Serve { host, port } => cmd_serve(config, host, port),
        Commands::Items { kind, json } => cmd_items(&config, kind, json),
        Commands::Ask { item_id, query } => cmd_ask(&config, &item_id, &query),
        Commands::Config { show } => cmd_config(&config, show),
    }
}

/// Builds the model provider from configuration.
///
/// Must run outside any async runtime: the blocking HTTP client owns one internally.
fn build_provider(config: &FolioConfig) -> Arc<dyn LlmProvider> {
    let mut client = GeminiClient::new()
        .with_model(config.llm.model.clone())
        .with_base_url(config.llm.base_url.clone())
        .with_http_config(LlmHttpConfig::from_config(&config.llm));
    if let Some(key) = config.llm.api_key.clone() {
        client = client.with_secret_api_key(key);
    }
    if !client.has_api_key() {
        tracing::warn!(
            "{} is not set; AI questions will receive the fallback answer",
            GeminiClient::API_KEY_ENV
        );
    }
    Arc::new(client)
}

fn cmd_serve(
    mut config: FolioConfig,
    host: Option<String>,
    port: Option<u16>,
) -> folio::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = Arc::new(ContentStore::load(&config.content_path)?);
    let provider = build_provider(&config);
    let state = AppState::from_config(&config, store, provider);
    server::run(&config, state)
}

fn cmd_items(config: &FolioConfig, kind: ItemKind, json: bool) -> folio::Result<()> {
    let store = ContentStore::load(&config.content_path)?;
    let items: Vec<&ContentItem> = match kind {
        ItemKind::All => store.all().collect(),
        ItemKind::Projects => store.projects().collect(),
        ItemKind::Research => store.research().collect(),
    };

    if json {
        let views: Vec<ItemView<'_>> = items.into_iter().map(ItemView::from).collect();
        let rendered =
            serde_json::to_string_pretty(&views).map_err(|e| folio::Error::OperationFailed {
                operation: "render_items".to_string(),
                cause: e.to_string(),
            })?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{:<40} {:<9} TITLE", "ID", "KIND");
    for item in items {
        println!("{:<40} {:<9} {}", item.id, item.kind(), item.title);
    }
    Ok(())
}

fn cmd_ask(config: &FolioConfig, item_id: &str, query: &str) -> folio::Result<()> {
    let store = Arc::new(ContentStore::load(&config.content_path)?);
    let gateway = QaGateway::new(store, build_provider(config));

    match gateway.answer(item_id, query) {
        Ok(answer) => {
            println!("{answer}");
            Ok(())
        },
        Err(folio::AskError::ItemNotFound) => Err(folio::Error::NotFound(item_id.to_string())),
        Err(e) => Err(folio::Error::InvalidInput(e.to_string())),
    }
}

fn cmd_config(config: &FolioConfig, show: bool) -> folio::Result<()> {
    if show {
        print!("{}", config.to_redacted_toml()?);
        return Ok(());
    }

    println!("content_path: {}", config.content_path.display());
    println!("listen:       {}:{}", config.server.host, config.server.port);
    println!(
        "rate_limit:   {} per {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
    println!("model:        {}", config.llm.model);
    println!(
        "api_key:      {}",
        if config.llm.api_key.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    Ok(())
}
