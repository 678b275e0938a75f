//! ytm4a-dl - YouTube to M4A acquisition service
//!
//! **Module Identity:**
//! - Name: ytm4a-dl
//! - Port: 5730 (default)
//!
//! Runs the local REST + SSE service (`serve`, the default) or a one-shot
//! preview + download from the command line (`fetch`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ytm4a_common::config::{
    default_config_path, load_or_default, write_toml_config, OutputFolderInitializer, TomlConfig,
    ENV_PORT, ENV_REMOTE_URL,
};
use ytm4a_common::events::{EventBus, PipelineEvent};

use ytm4a_dl::config::{ConfigOverrides, PipelineConfig};
use ytm4a_dl::models::{EditableTrackTags, PipelineResult};
use ytm4a_dl::services::PipelineOrchestrator;
use ytm4a_dl::AppState;

/// Command-line arguments for ytm4a-dl
#[derive(Parser, Debug)]
#[command(name = "ytm4a-dl")]
#[command(about = "Download YouTube audio as tagged M4A files")]
#[command(version)]
struct Args {
    /// TOML configuration file (default: ~/.config/ytm4a/ytm4a.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = ENV_PORT, global = true)]
    port: Option<u16>,

    /// Base URL of the remote pipeline backend
    #[arg(long, env = ENV_REMOTE_URL, global = true)]
    remote_url: Option<String>,

    /// Folder where finished files are written
    #[arg(short, long, global = true)]
    output_folder: Option<PathBuf>,

    /// Never contact the remote pipeline
    #[arg(long, global = true)]
    local_only: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the local HTTP service (default)
    Serve,

    /// Preview and download one video
    Fetch {
        /// Video URL
        url: String,

        /// Title tag (default: fetched title)
        #[arg(long)]
        title: Option<String>,

        /// Artist tag (default: fetched author)
        #[arg(long)]
        artist: Option<String>,
    },

    /// Write the TOML configuration with the command-line overrides applied
    /// (to --config or the default path) and exit
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config warnings go to stderr until the configured subscriber exists
    let toml_config = tracing::subscriber::with_default(bootstrap_subscriber(), || {
        load_or_default(args.config.as_deref())
    });
    init_tracing(&toml_config)?;

    info!(
        "Starting ytm4a-dl v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = ConfigOverrides {
        port: args.port,
        remote_base_url: args.remote_url.clone(),
        output_folder: args.output_folder.clone(),
        local_only: args.local_only,
    };

    if let Some(Command::InitConfig) = args.command {
        return init_config(args.config, &overrides.apply_to(&toml_config));
    }

    let port = overrides.port.unwrap_or(toml_config.port);
    let config = PipelineConfig::from_toml(&toml_config, overrides);

    let initializer = OutputFolderInitializer::new(config.output_folder.clone());
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize output folder: {}", e))?;
    info!("Output folder: {}", initializer.output_folder().display());

    let event_bus = Arc::new(EventBus::new(toml_config.event_bus_capacity));
    let orchestrator = Arc::new(
        PipelineOrchestrator::from_config(&config, event_bus.clone())
            .context("Failed to initialize pipeline")?,
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(AppState::new(orchestrator, event_bus), port).await,
        Command::Fetch { url, title, artist } => fetch(&orchestrator, &url, title, artist).await,
        Command::InitConfig => Ok(()),
    }
}

fn init_config(explicit: Option<PathBuf>, config: &TomlConfig) -> Result<()> {
    let path = explicit
        .or_else(default_config_path)
        .context("No configuration directory on this platform, pass --config")?;
    write_toml_config(config, &path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
    info!("Wrote configuration to {}", path.display());
    println!("{}", path.display());
    Ok(())
}

/// Stderr-only subscriber used while the TOML file is read
fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ytm4a_common=info")),
        )
        .finish()
}

/// `RUST_LOG` wins over the configured level; optional log file gets a copy
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ytm4a_dl={0},ytm4a_common={0}", config.logging.level)));

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = ytm4a_dl::build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn fetch(
    orchestrator: &PipelineOrchestrator,
    url: &str,
    title: Option<String>,
    artist: Option<String>,
) -> Result<()> {
    let mut rx = orchestrator.event_bus().subscribe();
    let progress_logger = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let PipelineEvent::ProgressUpdate { progress, .. } = event {
                info!(
                    "[{:>3}%] {}: {}",
                    progress.percentage,
                    progress.stage.as_str(),
                    progress.message
                );
            }
        }
    });

    let metadata = orchestrator.preview(url).await.result?;
    info!(
        title = %metadata.title,
        author = %metadata.author,
        degraded = metadata.degraded,
        "Preview complete"
    );

    let mut tags = EditableTrackTags::from_metadata(&metadata);
    if let Some(title) = title {
        tags.title = title;
    }
    if let Some(artist) = artist {
        tags.artist = artist;
    }

    let outcome = orchestrator.download(url, &tags).await;
    progress_logger.abort();

    match outcome.result {
        PipelineResult::Success { saved, .. } => {
            println!("{}", saved.file_path.display());
            Ok(())
        }
        PipelineResult::Failure(failure) => {
            error!(kind = failure.kind.code(), "Download failed");
            Err(failure.into())
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
