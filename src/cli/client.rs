//! IPC client for talking to the timer daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - One method per daemon command
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::cli::commands::CreateArgs;
use crate::config;
use crate::types::{IpcRequest, IpcResponse};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (1MB)
const MAX_RESPONSE_SIZE: u64 = 1024 * 1024;

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
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
    /// Attempts per request
    max_retries: u32,
}

impl IpcClient {
    /// Creates a client for the default socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if no state directory can be derived.
    pub fn new() -> Result<Self> {
        let socket_path = config::default_socket_path()?;
        Ok(Self::with_socket_path(socket_path))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        }
    }

    /// Sets the number of attempts per request (at least one).
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Creates or replaces a timer.
    pub async fn create(&self, args: &CreateArgs) -> Result<IpcResponse> {
        let request = IpcRequest::Create {
            id: args.id.clone(),
            mode: args.mode,
            duration: args.duration_secs(),
            label: args.label.clone(),
        };
        self.send_request_with_retry(&request).await
    }

    /// Starts a timer.
    pub async fn start(&self, id: &str) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Start { id: id.to_string() })
            .await
    }

    /// Pauses a timer.
    pub async fn pause(&self, id: &str) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Pause { id: id.to_string() })
            .await
    }

    /// Resets a timer, optionally to a new duration.
    pub async fn reset(&self, id: &str, duration: Option<u32>) -> Result<IpcResponse> {
        let request = IpcRequest::Reset {
            id: id.to_string(),
            duration,
        };
        self.send_request_with_retry(&request).await
    }

    /// Replaces a timer's label.
    pub async fn label(&self, id: &str, label: &str) -> Result<IpcResponse> {
        let request = IpcRequest::Label {
            id: id.to_string(),
            label: label.to_string(),
        };
        self.send_request_with_retry(&request).await
    }

    /// Deletes a timer.
    pub async fn delete(&self, id: &str) -> Result<IpcResponse> {
        self.send_request_with_retry(&IpcRequest::Delete { id: id.to_string() })
            .await
    }

    /// Queries one timer, or all timers when `id` is `None`.
    pub async fn status(&self, id: Option<&str>) -> Result<IpcResponse> {
        let request = match id {
            Some(id) => IpcRequest::Get { id: id.to_string() },
            None => IpcRequest::List,
        };
        self.send_request_with_retry(&request).await
    }

    /// Sends a request to the daemon with retry logic.
    ///
    /// Error responses from the daemon are not retried.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut attempt = 1;
        loop {
            match self.send_request(request).await {
                Ok(response) => return Self::check_response(response),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {:#}",
                        attempt,
                        self.max_retries,
                        e
                    );
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn check_response(response: IpcResponse) -> Result<IpcResponse> {
        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .with_context(|| {
                format!(
                    "Cannot connect to the daemon at {:?}; start it with 'dashtimer daemon'",
                    self.socket_path
                )
            })?;

        let request_json = serde_json::to_vec(request).context("Failed to serialize request")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(&request_json),
        )
        .await
        .context("Write timed out")?
        .context("Failed to send request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to close request stream")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("Read timed out")?
        .context("Failed to receive response")?;

        if buffer.is_empty() {
            anyhow::bail!("No response from daemon");
        }

        serde_json::from_slice(&buffer).context("Failed to parse response")
    }
}

// ============================================================================
// Tests
// ============================================================================
