//! ClipQ Player (clipq-player) - Main entry point
//!
//! Accepts clip requests over HTTP, resolves them into clip URLs, and plays
//! them one at a time in a full-screen browser.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use clipq_player::api::{self, AppContext};
use clipq_player::config::{PlayerConfig, CONFIG_ENV_VAR};
use clipq_player::intake::IntakeGate;
use clipq_player::player::{Player, PlayerDeps};
use clipq_player::playback::{RoiSize, TemplateDetector, WebDriverRenderer};
use clipq_player::state::SharedState;
use clipq_player::upstream::{
    ChannelDirectory, ClipResolver, NoDirectory, StaticResolver, TwitchClient,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for clipq-player
#[derive(Parser, Debug)]
#[command(name = "clipq-player")]
#[command(about = "Serialized clip playback with unavailable-screen detection")]
#[command(version)]
struct Args {
    /// Path to config file (overrides CLIPQ_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CLIPQ_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config: PlayerConfig =
        clipq_common::config::load_or_default(args.config.as_deref(), CONFIG_ENV_VAR)
            .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }

    // Initialize tracing
    let default_filter = format!(
        "clipq_player={},tower_http={}",
        config.logging.level, config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ClipQ Player v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let detector = Arc::new(
        TemplateDetector::from_config(&config.detector)
            .context("Failed to load reference patterns")?,
    );
    let backend = Arc::new(WebDriverRenderer::new(config.renderer.clone()));
    let intake = Arc::new(
        IntakeGate::from_config(&config.intake).context("Invalid [intake] configuration")?,
    );

    let (resolver, directory): (Arc<dyn ClipResolver>, Arc<dyn ChannelDirectory>) =
        match config.twitch.clone() {
            Some(twitch) => {
                let client = Arc::new(
                    TwitchClient::new(twitch).context("Failed to create Twitch client")?,
                );
                info!("Resolving clips through the Twitch API");
                let resolver: Arc<dyn ClipResolver> = client.clone();
                let directory: Arc<dyn ChannelDirectory> = client;
                (resolver, directory)
            }
            None => {
                warn!("No [twitch] credentials configured; /clip accepts direct URLs only");
                let resolver: Arc<dyn ClipResolver> = Arc::new(StaticResolver);
                let directory: Arc<dyn ChannelDirectory> = Arc::new(NoDirectory);
                (resolver, directory)
            }
        };

    let state = Arc::new(SharedState::new());
    let player = Arc::new(Player::spawn(PlayerDeps {
        state: Arc::clone(&state),
        backend,
        detector,
        directory,
        display: None,
        playback: config.playback.clone(),
        roi: RoiSize {
            width: config.detector.roi_width,
            height: config.detector.roi_height,
        },
    }));

    let ctx = AppContext {
        state,
        player: Arc::clone(&player),
        resolver,
        intake,
    };

    api::run(config.port, ctx, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    player.shutdown();
    player.join().await;

    info!("Shutdown complete");
    Ok(())
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
