//! Settings persistence for the timer configuration.
//!
//! The engine never persists anything. Hosts read the configuration at
//! session start and write it back after an accepted change, through an
//! opaque key-value store:
//!
//! ```text
//! ┌──────────────────┐  load / save   ┌──────────────────┐
//! │   TimerConfig    │ ◀────────────▶ │  KeyValueStore   │
//! └──────────────────┘  JSON under    └────────┬─────────┘
//!                     "pomodoroSettings"       │
//!                                     ┌────────┴─────────┐
//!                                     │ FileStore        │
//!                                     │ MemoryStore      │
//!                                     └──────────────────┘
//! ```

mod error;
mod store;

use std::path::PathBuf;

pub use error::StoreError;
pub use store::{FileStore, MemoryStore};

use crate::types::TimerConfig;

/// Key the configuration snapshot is stored under.
pub const SETTINGS_KEY: &str = "pomodoroSettings";

/// Directory under the home directory holding settings and the socket.
pub const DATA_DIR_NAME: &str = ".pomodash";

/// Settings file name inside the data directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Opaque string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Returns `~/.pomodash`.
///
/// # Errors
///
/// Returns [`StoreError::HomeNotFound`] if the home directory is unknown.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .ok_or(StoreError::HomeNotFound)
}

/// Returns `~/.pomodash/settings.json`.
///
/// # Errors
///
/// Returns [`StoreError::HomeNotFound`] if the home directory is unknown.
pub fn default_settings_path() -> Result<PathBuf, StoreError> {
    Ok(data_dir()?.join(SETTINGS_FILE_NAME))
}

/// Loads the configuration, falling back to defaults.
///
/// A missing key yields the defaults silently. Unreadable, unparseable or
/// invalid snapshots are logged and also yield the defaults.
pub fn load_configuration(store: &dyn KeyValueStore) -> TimerConfig {
    let raw = match store.get(SETTINGS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return TimerConfig::default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read settings, using defaults");
            return TimerConfig::default();
        }
    };

    let config: TimerConfig = match serde_json::from_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "stored settings are malformed, using defaults");
            return TimerConfig::default();
        }
    };

    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "stored settings are invalid, using defaults");
        return TimerConfig::default();
    }

    config.normalized()
}

/// Writes the configuration snapshot.
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn save_configuration(store: &dyn KeyValueStore, config: &TimerConfig) -> Result<(), StoreError> {
    let json = serde_json::to_string(config)?;
    store.set(SETTINGS_KEY, &json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BreakType;

    #[test]
    fn test_load_missing_returns_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_configuration(&store), TimerConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let config = TimerConfig::default()
            .with_focus_minutes(45)
            .with_break_type(BreakType::Long);

        save_configuration(&store, &config).unwrap();
        assert_eq!(load_configuration(&store), config);
    }

    #[test]
    fn test_saved_shape_uses_settings_key() {
        let store = MemoryStore::new();
        save_configuration(&store, &TimerConfig::default()).unwrap();

        let raw = store.get(SETTINGS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"focusMinutes\":25"));
        assert!(raw.contains("\"breakType\":\"short\""));
    }

    #[test]
    fn test_load_malformed_returns_defaults() {
        let store = MemoryStore::new();
        store.set(SETTINGS_KEY, "{broken").unwrap();
        assert_eq!(load_configuration(&store), TimerConfig::default());
    }

    #[test]
    fn test_load_invalid_returns_defaults() {
        let store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, r#"{"focusMinutes":0,"shortBreakMinutes":5,"longBreakMinutes":15}"#)
            .unwrap();
        assert_eq!(load_configuration(&store), TimerConfig::default());
    }

    #[test]
    fn test_load_clamps_cycles() {
        let store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, r#"{"focusMinutes":25,"cyclesBeforeLongBreak":50}"#)
            .unwrap();
        assert_eq!(load_configuration(&store).cycles_before_long_break, 10);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join(SETTINGS_FILE_NAME));
        let config = TimerConfig::default().with_short_break_minutes(8);

        save_configuration(&store, &config).unwrap();

        let reopened = FileStore::new(dir.path().join(SETTINGS_FILE_NAME));
        assert_eq!(load_configuration(&reopened), config);
    }
}
