//! Settings store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur reading or writing the settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The home directory could not be determined.
    #[error("ホームディレクトリが見つかりません")]
    HomeNotFound,

    /// Reading or writing the backing file failed.
    #[error("設定ファイルにアクセスできません: {path}: {source}")]
    Io {
        /// File that was accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The backing file or a stored value is not valid JSON.
    #[error("設定データの形式が不正です: {0}")]
    Parse(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the error came from the filesystem.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
