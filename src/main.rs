//! language-toggler: background daemon for switching keyboard input sources
//!
//! This daemon runs as a LaunchAgent and provides:
//! - Global hotkey detection via CGEventTap
//! - A toggle between two chosen input sources plus per-source hotkeys
//! - Recording of new hotkeys from the next pressed chord
//! - IPC server for the settings UI

mod bindings;
mod config;
mod dispatch;
mod engine;
mod events;
mod hotkey;
mod indicator;
mod ipc;
mod lifecycle;
mod sources;
#[cfg(test)]
mod testing;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bindings::{BindingStore, FileStore};
use crate::config::Config;
use crate::engine::{Engine, EngineHandle, Switcher};
use crate::events::ToggleEvent;
use crate::hotkey::{ensure_trusted, AccessibilityTrust, EventInterceptor};
use crate::indicator::EventIndicator;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::sources::{Directory, SystemBackend};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "language-toggler starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.settings_path, "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // Engine -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<ToggleEvent>(64);

    let bindings = BindingStore::load(FileStore::open(&config.settings_path));
    let switcher = Switcher::new(
        Directory::new(SystemBackend::default()),
        Box::new(EventIndicator::new(event_tx.clone())),
    );
    let mut engine = Engine::new(switcher, bindings, event_tx.clone());

    // Event tap and IPC clients -> engine
    let (command_tx, command_rx) = mpsc::channel(64);
    let handle = EngineHandle::new(command_tx);

    let interceptor = EventInterceptor::new(handle.clone());
    if ensure_trusted(&AccessibilityTrust) {
        match interceptor.install() {
            Ok(()) => info!("hotkey interception enabled"),
            Err(e) => {
                error!(?e, "failed to install event tap");
                warn!("continuing without hotkey support");
            }
        }
    } else {
        warn!("accessibility access not granted, continuing without hotkey support");
    }

    let server = Server::new(
        &config.socket_path,
        handle,
        event_tx,
        interceptor.is_installed(),
    )?;

    info!("daemon initialized, entering main loop");

    // The engine is polled here rather than spawned: input source calls
    // stay on the main thread.
    tokio::select! {
        _ = engine.run(command_rx) => {
            info!("engine exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "signal handling failed"),
            }
        }
    }

    info!("shutting down...");

    interceptor.uninstall();
    server.shutdown().await;

    info!("language-toggler stopped");

    Ok(())
}
