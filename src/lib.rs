//! pomodash library
//!
//! Pomodoro interval timer with a daemon and a socket-driven CLI.
//! It includes:
//! - Timer engine cycling Focus, short break and long break modes
//! - Scaled countdown clock and the service that binds it to the engine
//! - IPC server/client for daemon-CLI communication
//! - Settings persistence through a key-value store
//! - CLI command parsing and display utilities

pub mod cli;
pub mod daemon;
pub mod settings;
pub mod types;

// Re-export commonly used types for convenience
pub use daemon::{EngineError, TimerEngine, TimerEvent, TimerService};
pub use types::{
    BreakType, ConfigPatch, IpcRequest, IpcResponse, TimerConfig, TimerMode, TimerSnapshot,
};
