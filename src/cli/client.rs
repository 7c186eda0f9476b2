//! IPC Client for communicating with the timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::daemon::ipc::default_socket_path;
use crate::types::{ConfigPatch, IpcRequest, IpcResponse, TimerMode};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client with the default socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown.
    pub fn new() -> Result<Self> {
        let socket_path = default_socket_path().context("ソケットのパスを決定できません")?;
        Ok(Self::with_socket_path(socket_path))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Starts or pauses the countdown.
    pub async fn toggle(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Toggle).await
    }

    /// Resets the current mode.
    pub async fn reset(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Reset).await
    }

    /// Skips to the next mode.
    pub async fn skip(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Skip).await
    }

    /// Sets the speed multiplier.
    pub async fn speed(&self, multiplier: f64) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Speed { multiplier })
            .await
    }

    /// Switches the mode.
    pub async fn mode(&self, mode: TimerMode) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Mode { mode }).await
    }

    /// Overrides the cycle counter.
    pub async fn cycle(&self, count: i64) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Cycle { count }).await
    }

    /// Applies a partial configuration update.
    pub async fn configure(&self, patch: ConfigPatch) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Configure { patch })
            .await
    }

    /// Enables or disables auto-advance.
    pub async fn auto_advance(&self, enabled: bool) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::AutoAdvance { enabled })
            .await
    }

    /// Sends a status query to the daemon.
    pub async fn status(&self) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Status).await
    }

    /// Sends a request, retrying only the connection.
    ///
    /// Once the request has been handed to the daemon it is never sent
    /// again, since toggle, skip and mode are not idempotent. An error
    /// response from the daemon is returned as an error.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let stream = self.connect_with_retry().await?;
        let response = Self::exchange(stream, request).await?;
        Self::check_response(response)
    }

    fn check_response(response: IpcResponse) -> Result<IpcResponse> {
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Connects to the daemon with linear backoff.
    async fn connect_with_retry(&self) -> Result<UnixStream> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.connect().await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::warn!("接続失敗 (試行 {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Daemonに接続できませんでした")))
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("接続がタイムアウトしました")?
            .context("Daemonに接続できません。'pomodash daemon' を起動してください")
    }

    /// Writes one request and reads the response on a connected stream.
    async fn exchange(mut stream: UnixStream, request: &IpcRequest) -> Result<IpcResponse> {
        let request_json =
            serde_json::to_vec(request).context("リクエストのシリアライズに失敗しました")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("書き込みがタイムアウトしました")?
        .context("リクエストの送信に失敗しました")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("シャットダウンに失敗しました")?;

        let mut buffer = Vec::new();
        let mut limited = (&mut stream).take(MAX_RESPONSE_SIZE);
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            limited.read_to_end(&mut buffer),
        )
        .await
        .context("読み込みがタイムアウトしました")?
        .context("レスポンスの受信に失敗しました")?;

        if buffer.is_empty() {
            anyhow::bail!("Daemonからの応答がありませんでした");
        }

        let response: IpcResponse =
            serde_json::from_slice(&buffer).context("レスポンスのパースに失敗しました")?;

        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::UnixListener;

    use crate::types::{TimerMode, TimerSnapshot};

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        // Keep the directory so it's not deleted
        std::mem::forget(dir);
        path
    }

    fn sample_snapshot() -> TimerSnapshot {
        TimerSnapshot {
            mode: TimerMode::Focus,
            remaining_seconds: 1500,
            remaining_ms: 1_500_000,
            is_running: false,
            cycle_count: 0,
            progress: 0.0,
            speed_multiplier: 1.0,
            auto_advance: true,
        }
    }

    /// Answers `count` connections with `response`, returning the requests seen.
    fn spawn_mock_server(
        socket_path: &Path,
        response: IpcResponse,
        count: usize,
    ) -> tokio::task::JoinHandle<Vec<IpcRequest>> {
        let listener = UnixListener::bind(socket_path).unwrap();

        tokio::spawn(async move {
            let mut requests = Vec::new();
            for _ in 0..count {
                let (mut stream, _) = listener.accept().await.unwrap();

                let mut buffer = Vec::new();
                stream.read_to_end(&mut buffer).await.unwrap();
                requests.push(serde_json::from_slice(&buffer).unwrap());

                let json = serde_json::to_vec(&response).unwrap();
                stream.write_all(&json).await.unwrap();
                stream.flush().await.unwrap();
            }
            requests
        })
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_with_socket_path() {
            let path = PathBuf::from("/tmp/test.sock");
            let client = IpcClient::with_socket_path(path.clone());
            assert_eq!(client.socket_path(), path.as_path());
        }

        #[tokio::test(start_paused = true)]
        async fn test_connection_failure() {
            let socket_path = create_temp_socket_path();
            let client = IpcClient::with_socket_path(socket_path);

            let err = client.status().await.unwrap_err();
            assert!(format!("{:#}", err).contains("Daemonに接続できません"));
        }

        #[tokio::test]
        async fn test_send_status_request() {
            let socket_path = create_temp_socket_path();
            let server = spawn_mock_server(
                &socket_path,
                IpcResponse::success("", Some(sample_snapshot())),
                1,
            );

            let client = IpcClient::with_socket_path(socket_path);
            let response = client.status().await.unwrap();
            assert_eq!(response.data.unwrap().remaining_seconds, 1500);

            let requests = server.await.unwrap();
            assert_eq!(requests, vec![IpcRequest::Status]);
        }

        #[tokio::test]
        async fn test_send_configure_request() {
            let socket_path = create_temp_socket_path();
            let server = spawn_mock_server(
                &socket_path,
                IpcResponse::success("設定を更新しました", Some(sample_snapshot())),
                1,
            );

            let patch = ConfigPatch {
                long_break_minutes: Some(30),
                ..ConfigPatch::default()
            };
            let client = IpcClient::with_socket_path(socket_path);
            client.configure(patch.clone()).await.unwrap();

            let requests = server.await.unwrap();
            assert_eq!(requests, vec![IpcRequest::Configure { patch }]);
        }

        #[tokio::test]
        async fn test_error_response_is_not_retried() {
            let socket_path = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let accepted = Arc::new(AtomicUsize::new(0));

            let counter = accepted.clone();
            let server = tokio::spawn(async move {
                loop {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    counter.fetch_add(1, Ordering::SeqCst);

                    let mut buffer = Vec::new();
                    stream.read_to_end(&mut buffer).await.unwrap();
                    let json =
                        serde_json::to_vec(&IpcResponse::error("速度倍率は正の数で指定してください"))
                            .unwrap();
                    stream.write_all(&json).await.unwrap();
                }
            });

            let client = IpcClient::with_socket_path(socket_path);
            let err = client.speed(0.0).await.unwrap_err();

            assert!(err.to_string().contains("速度倍率"));
            assert_eq!(accepted.load(Ordering::SeqCst), 1);
            server.abort();
        }

        #[tokio::test]
        async fn test_delivered_request_is_not_resent_without_reply() {
            let socket_path = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let delivered = Arc::new(AtomicUsize::new(0));

            let counter = delivered.clone();
            let server = tokio::spawn(async move {
                loop {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    let mut buffer = Vec::new();
                    stream.read_to_end(&mut buffer).await.unwrap();
                    if serde_json::from_slice::<IpcRequest>(&buffer).is_ok() {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    // close without replying
                }
            });

            let client = IpcClient::with_socket_path(socket_path);
            let err = client.toggle().await.unwrap_err();

            assert!(err.to_string().contains("応答がありませんでした"));
            assert_eq!(delivered.load(Ordering::SeqCst), 1);
            server.abort();
        }
    }
}
