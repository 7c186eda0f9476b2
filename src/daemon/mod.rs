//! Daemon module for the Pomodoro Timer.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Interval timer engine with mode transitions and cycle counting
//! - `clock`: Scaled countdown clock producing ticks
//! - `service`: Engine plus live clock behind one lock
//! - `ipc`: Unix socket server and request dispatch

pub mod clock;
pub mod error;
pub mod ipc;
pub mod service;
pub mod timer;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::settings::{self, FileStore, KeyValueStore};

pub use clock::{ClockHandle, CountdownClock, TickOutcome};
pub use error::EngineError;
pub use ipc::{IpcServer, RequestHandler};
pub use service::TimerService;
pub use timer::{TimerEngine, TimerEvent};

// ============================================================================
// DaemonOptions
// ============================================================================

/// Where the daemon listens and keeps its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonOptions {
    /// Unix socket path
    pub socket_path: PathBuf,
    /// Settings file path
    pub settings_path: PathBuf,
}

impl DaemonOptions {
    /// Uses `~/.pomodash` for both paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown.
    pub fn from_data_dir() -> Result<Self> {
        Ok(Self {
            socket_path: ipc::default_socket_path()?,
            settings_path: settings::default_settings_path()?,
        })
    }

    /// Overrides the socket path.
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Overrides the settings path.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }
}

// ============================================================================
// run
// ============================================================================

/// Runs the daemon until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or accepting fails.
pub async fn run(options: DaemonOptions) -> Result<()> {
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&options.settings_path));
    let config = settings::load_configuration(store.as_ref());
    tracing::info!(
        focus = config.focus_minutes,
        short_break = config.short_break_minutes,
        long_break = config.long_break_minutes,
        break_type = config.break_type.as_str(),
        "configuration loaded"
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let engine = TimerEngine::new(config, event_tx);
    let (service, ticks) = TimerService::new(engine);

    let event_task = tokio::spawn(log_events(event_rx));
    let tick_task = {
        let service = service.clone();
        tokio::spawn(async move { service.run(ticks).await })
    };

    let server = IpcServer::new(&options.socket_path)?;
    let handler = RequestHandler::new(service, store);
    tracing::info!(socket = %server.socket_path().display(), "daemon listening");

    let result = tokio::select! {
        result = ipc::serve(&server, &handler) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            tracing::info!("shutting down");
            Ok(())
        }
    };

    tick_task.abort();
    event_task.abort();
    result
}

/// Logs engine events until the engine is dropped.
async fn log_events(mut events: mpsc::UnboundedReceiver<TimerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            TimerEvent::Tick { remaining_seconds } => {
                tracing::trace!(remaining_seconds, "tick");
            }
            TimerEvent::Expired { mode } => {
                tracing::info!(mode = mode.as_str(), "countdown finished");
            }
            TimerEvent::ModeChanged {
                from,
                to,
                cycle_count,
                auto_started,
            } => {
                tracing::info!(
                    from = from.as_str(),
                    to = to.as_str(),
                    cycle_count,
                    auto_started,
                    "mode changed"
                );
            }
            other => tracing::debug!(event = ?other, "timer event"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
