//! Tannoy Playback Agent (tannoy-pa) - Main entry point
//!
//! Wires together the MQTT bus glue, the playback queue worker, the room
//! controller, and the HTTP status surface.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tannoy_common::events::EventBus;
use tannoy_pa::bus::{self, Dispatcher};
use tannoy_pa::playback::SoundQueue;
use tannoy_pa::rooms::RoomController;
use tannoy_pa::server;

/// Command-line arguments for tannoy-pa
#[derive(Parser, Debug)]
#[command(name = "tannoy-pa")]
#[command(about = "Sound playback dispatcher for the Tannoy speaker network")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "TANNOY_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder of the sound repository (overrides config)
    #[arg(short, long, env = "TANNOY_SOUNDS_ROOT")]
    sounds_root: Option<PathBuf>,

    /// HTTP status port (overrides config)
    #[arg(short, long, env = "TANNOY_PA_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tannoy_pa=debug,tannoy_common=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = tannoy_common::config::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(root) = args.sounds_root {
        config.sounds.root = root;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }

    info!("Starting Tannoy playback agent");
    info!("Sound repository: {}", config.sounds.root.display());

    tokio::fs::create_dir_all(&config.speech.cache_dir)
        .await
        .context("Failed to create speech cache directory")?;

    let events = EventBus::new(100);
    let rooms = RoomController::new(config.rooms.channels.clone(), config.rooms.mixer.clone());
    let queue = SoundQueue::start(events.clone(), rooms);
    let dispatcher = Dispatcher::new(&config, queue.clone());

    // HTTP status surface
    {
        let queue = queue.clone();
        let port = config.http.port;
        tokio::spawn(async move {
            if let Err(e) = server::start(port, queue).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    // The bus loop serves until shutdown
    tokio::select! {
        result = bus::run(&config, dispatcher, events.clone()) => {
            result.context("Bus connection failed")?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown complete");
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
