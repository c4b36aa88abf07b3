//! stream-companion-daemon: background hotkey daemon for the streaming
//! companion
//!
//! Registers the built-in shortcuts, listens for global key events and
//! logs every trigger until SIGINT/SIGTERM.

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stream_companion::app::{default_shortcuts, register_shortcuts};
use stream_companion::config::Config;
use stream_companion::events::ManagerEvent;
use stream_companion::hotkey::HotkeyManager;
use stream_companion::lifecycle::ShutdownSignal;

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
        "stream-companion-daemon starting"
    );

    let config = Config::load()?;
    info!(activator = ?config.activator, "configuration loaded");

    let shutdown = ShutdownSignal::new();
    let manager = HotkeyManager::with_platform_listener();
    let mut events = manager.subscribe();

    let activator = config.activator_spec();
    register_shortcuts(&manager, &default_shortcuts(), activator.as_ref(), |shortcut| {
        info!(label = %shortcut.label, "hotkey triggered");
        Ok(())
    });

    if !manager.start() {
        warn!("continuing without global hotkeys - check Accessibility permissions");
    }

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = async {
            loop {
                match events.recv().await {
                    Ok(event) => log_event(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "manager event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("manager event stream closed");
        }

        result = shutdown.wait() => {
            result?;
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");
    manager.stop();
    info!("stream-companion-daemon stopped");

    Ok(())
}

fn log_event(event: &ManagerEvent) {
    match event {
        ManagerEvent::CallbackFailed { .. } | ManagerEvent::RegistrationRejected { .. } => {
            warn!(%event, "manager event");
        }
        _ => info!(%event, "manager event"),
    }
}
