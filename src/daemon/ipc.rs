//! IPC Server for the timer daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer intents
//! - Persisting accepted configuration changes

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};

use crate::settings::{self, KeyValueStore, StoreError};
use crate::types::{ConfigPatch, IpcRequest, IpcResponse, TimerMode, TimerSnapshot};

use super::error::EngineError;
use super::service::TimerService;

// ============================================================================
// Constants
// ============================================================================

/// Socket file name inside the data directory.
pub const SOCKET_FILE_NAME: &str = "pomodash.sock";

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

/// Returns `~/.pomodash/pomodash.sock`.
///
/// # Errors
///
/// Returns an error if the home directory is unknown.
pub fn default_socket_path() -> Result<PathBuf, StoreError> {
    Ok(settings::data_dir()?.join(SOCKET_FILE_NAME))
}

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// Client closed the connection without sending anything
    #[error("Connection closed by client")]
    EmptyRequest,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Reads until the client half-closes, bounded by a timeout and
    /// [`MAX_REQUEST_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(512);
        let mut limited = stream.take(MAX_REQUEST_SIZE as u64 + 1);

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            limited.read_to_end(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            return Err(IpcError::EmptyRequest.into());
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest =
            serde_json::from_slice(&buffer).context("Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the timer service.
#[derive(Clone)]
pub struct RequestHandler {
    /// Timer service shared with the tick loop
    service: TimerService,
    /// Where accepted configuration changes are written
    store: Arc<dyn KeyValueStore>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(service: TimerService, store: Arc<dyn KeyValueStore>) -> Self {
        Self { service, store }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        tracing::debug!(?request, "handling request");

        match request {
            IpcRequest::Toggle => self.handle_toggle().await,
            IpcRequest::Reset => {
                let snapshot = self.service.reset().await;
                IpcResponse::success("タイマーをリセットしました", Some(snapshot))
            }
            IpcRequest::Skip => {
                let snapshot = self.service.skip().await;
                IpcResponse::success(
                    format!("{} に切り替えました", snapshot.mode.label()),
                    Some(snapshot),
                )
            }
            IpcRequest::Speed { multiplier } => {
                Self::respond(
                    self.service.set_speed(multiplier).await,
                    format!("速度を {}x に設定しました", multiplier),
                )
            }
            IpcRequest::Mode { mode } => self.handle_mode(mode).await,
            IpcRequest::Cycle { count } => {
                let snapshot = self.service.update_cycle(count).await;
                IpcResponse::success(
                    format!("サイクルを {} に設定しました", snapshot.cycle_count),
                    Some(snapshot),
                )
            }
            IpcRequest::Configure { patch } => self.handle_configure(patch).await,
            IpcRequest::AutoAdvance { enabled } => {
                let snapshot = self.service.set_auto_advance(enabled).await;
                let message = if enabled {
                    "自動開始を有効にしました"
                } else {
                    "自動開始を無効にしました"
                };
                IpcResponse::success(message, Some(snapshot))
            }
            IpcRequest::Status => {
                let snapshot = self.service.snapshot().await;
                IpcResponse::success("", Some(snapshot))
            }
        }
    }

    /// Handles the toggle command.
    async fn handle_toggle(&self) -> IpcResponse {
        let snapshot = self.service.toggle_run().await;
        let message = if snapshot.is_running {
            "タイマーを開始しました"
        } else {
            "タイマーを一時停止しました"
        };
        IpcResponse::success(message, Some(snapshot))
    }

    /// Handles the mode command.
    async fn handle_mode(&self, mode: TimerMode) -> IpcResponse {
        let snapshot = self.service.set_mode(mode).await;
        IpcResponse::success(
            format!("{} に切り替えました", snapshot.mode.label()),
            Some(snapshot),
        )
    }

    /// Handles the configure command, persisting the result on success.
    async fn handle_configure(&self, patch: ConfigPatch) -> IpcResponse {
        if patch.is_empty() {
            let snapshot = self.service.snapshot().await;
            return IpcResponse::success("変更はありません", Some(snapshot));
        }

        let (snapshot, config) = match self.service.apply_patch(&patch).await {
            Ok(accepted) => accepted,
            Err(e) => return IpcResponse::error(e.to_string()),
        };

        if let Err(e) = settings::save_configuration(self.store.as_ref(), &config) {
            tracing::warn!(error = %e, "failed to persist settings");
        }

        IpcResponse::success("設定を更新しました", Some(snapshot))
    }

    fn respond(
        result: Result<TimerSnapshot, EngineError>,
        message: impl Into<String>,
    ) -> IpcResponse {
        match result {
            Ok(snapshot) => IpcResponse::success(message, Some(snapshot)),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }
}

// ============================================================================
// Serving
// ============================================================================

/// Accepts connections forever, handling each on its own task.
///
/// # Errors
///
/// Returns an error only if accepting a connection fails.
pub async fn serve(server: &IpcServer, handler: &RequestHandler) -> Result<()> {
    loop {
        let mut stream = server.accept().await?;
        let handler = handler.clone();

        tokio::spawn(async move {
            let response = match IpcServer::receive_request(&mut stream).await {
                Ok(request) => handler.handle(request).await,
                Err(e) => {
                    tracing::warn!(error = %e, "invalid request");
                    IpcResponse::error(e.to_string())
                }
            };

            if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
                tracing::warn!(error = %e, "failed to send response");
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
