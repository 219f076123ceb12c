//! Subbatch - Batch Subtitle Translation
//!
//! This is the main entry point for the Subbatch application, which translates
//! the subtitle files of every media folder under a root directory using ollama.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subbatch::cli::Args;
use subbatch::config::Config;
use subbatch::error::SubbatchError;
use subbatch::language::Language;
use subbatch::translate::OllamaBackend;
use subbatch::workflow::Workflow;

const DEFAULT_CONFIG_FILE: &str = "subbatch.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    let _log_guard = setup_logging(args.verbose)?;
    info!("Starting Subbatch - Batch Subtitle Translation");

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    args.apply_to(&mut config);
    config.validate()?;

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        info!("Saved configuration to {}", path.display());
        return Ok(());
    }

    let target = args.target_language();
    log_settings(&args.root, &target, &config);

    if !args.root.is_dir() {
        let err = SubbatchError::RootNotFound(args.root.clone());
        error!("{}", err);
        return Err(err.into());
    }

    let backend = OllamaBackend::new(config.translate.clone())?;
    if config.batch.check_backend {
        if let Err(e) = backend.check_availability().await {
            warn!("{}", e);
            warn!("Continuing anyway; units that cannot be translated keep their original text");
        }
    }

    let workflow = Workflow::new(config, target, Arc::new(backend));
    let summary = workflow.run(&args.root).await.inspect_err(|e| error!("{}", e))?;

    info!("Subbatch completed: {}", summary);
    Ok(())
}

fn log_settings(root: &Path, target: &Language, config: &Config) {
    info!("Root directory: {}", root.display());
    info!("Target language: {}", target);
    info!("Source language: {}", config.batch.source);
    info!("Model: {}", config.translate.model);
    info!("Ollama URL: {}", config.translate.endpoint);
    info!("Request timeout: {}s", config.translate.timeout_secs);
    info!("Force translate: {}", config.batch.force);
    info!("Skip if target exists: {}", config.batch.skip_if_target_exists);
    info!("Parallel workers: {}", config.batch.workers);
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".subbatch").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subbatch.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subbatch.log").display()
    );

    Ok(guard)
}
