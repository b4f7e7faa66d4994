//! IPC server for the timer daemon.
//!
//! Clients connect over a Unix domain socket, write one JSON request, shut
//! down their write half and read back one JSON response:
//! - [`IpcServer`] owns the listener and the socket file
//! - [`RequestHandler`] maps requests onto [`TimerService`] operations

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use super::service::TimerService;
use crate::types::{IpcRequest, IpcResponse, ResponseData, Timer};

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes
const MAX_REQUEST_SIZE: usize = 16 * 1024;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// The client closed the connection without sending anything
    #[error("Connection closed by client")]
    ConnectionClosed,

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,

    /// Request body is not a valid command
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// A stale socket file left by a previous daemon is removed first. A
    /// socket that still accepts connections belongs to a live daemon and is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if another daemon is listening on the path or the
    /// socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            match std::os::unix::net::UnixStream::connect(socket_path) {
                Ok(_) => bail!("A daemon is already running on {:?}", socket_path),
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionRefused | ErrorKind::NotFound
                    ) =>
                {
                    debug!("Removing stale socket {:?}", socket_path);
                    std::fs::remove_file(socket_path).with_context(|| {
                        format!("Failed to remove existing socket: {:?}", socket_path)
                    })?;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to check existing socket: {:?}", socket_path)
                    })
                }
            }
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

    /// Reads one request, up to end of stream or the size limit.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, oversize or undecodable input.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest, IpcError> {
        let mut buffer = Vec::with_capacity(1024);
        let mut limited = stream.take(MAX_REQUEST_SIZE as u64 + 1);

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            limited.read_to_end(&mut buffer),
        )
        .await;

        match read_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string())),
            Err(_) => return Err(IpcError::Timeout),
        }

        if buffer.is_empty() {
            return Err(IpcError::ConnectionClosed);
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge);
        }

        serde_json::from_slice(&buffer).map_err(|e| IpcError::InvalidRequest(e.to_string()))
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
        stream
            .shutdown()
            .await
            .context("Failed to close response stream")?;

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

/// Serves one client connection: request in, response out.
///
/// A request that cannot be read or decoded still gets an error response
/// when the client is listening.
///
/// # Errors
///
/// Returns an error only if the response cannot be written.
pub async fn serve_connection(mut stream: UnixStream, handler: &RequestHandler) -> Result<()> {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => {
            debug!("IPC request: {:?}", request);
            handler.handle(request).await
        }
        Err(IpcError::ConnectionClosed) => {
            debug!("Client disconnected without a request");
            return Ok(());
        }
        Err(e) => {
            warn!("Rejected IPC request: {}", e);
            IpcResponse::error(e.to_string())
        }
    };
    IpcServer::send_response(&mut stream, &response).await
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the timer service.
#[derive(Clone)]
pub struct RequestHandler {
    service: TimerService,
}

impl RequestHandler {
    /// Creates a new request handler over the given service.
    pub fn new(service: TimerService) -> Self {
        Self { service }
    }

    /// Handles an IPC request and returns the appropriate response.
    ///
    /// Commands aimed at an unknown id are not errors; they succeed with no
    /// data, matching the store's silent no-op.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        if request.timer_id().is_some_and(|id| id.trim().is_empty()) {
            return IpcResponse::error("Timer id must not be empty");
        }

        match request {
            IpcRequest::Create {
                id,
                mode,
                duration,
                label,
            } => {
                let timer = self.service.create_timer(&id, mode, duration, label).await;
                IpcResponse::success(
                    format!("Created {} timer '{}'", timer.mode, timer.id),
                    Some(ResponseData::single(timer)),
                )
            }
            IpcRequest::Start { id } => {
                let timer = self.service.start_timer(&id).await;
                match timer {
                    Some(t) if !t.is_active => respond(
                        &id,
                        Some(t),
                        "Timer has already finished; reset it first",
                    ),
                    other => respond(&id, other, "Started"),
                }
            }
            IpcRequest::Pause { id } => {
                let timer = self.service.pause_timer(&id).await;
                respond(&id, timer, "Paused")
            }
            IpcRequest::Reset { id, duration } => {
                let timer = self.service.reset_timer(&id, duration).await;
                respond(&id, timer, "Reset")
            }
            IpcRequest::Label { id, label } => {
                let timer = self.service.set_timer_label(&id, label).await;
                respond(&id, timer, "Relabeled")
            }
            IpcRequest::Delete { id } => {
                let timer = self.service.delete_timer(&id).await;
                respond(&id, timer, "Deleted")
            }
            IpcRequest::Get { id } => {
                let timer = self.service.get_timer(&id).await;
                respond(&id, timer, "")
            }
            IpcRequest::List => {
                let timers = self.service.timers().await;
                IpcResponse::success("", Some(ResponseData::many(timers)))
            }
        }
    }
}

fn respond(id: &str, timer: Option<Timer>, verb: &str) -> IpcResponse {
    match timer {
        Some(timer) => {
            let message = if verb.is_empty() {
                String::new()
            } else {
                format!("{} timer '{}'", verb, id)
            };
            IpcResponse::success(message, Some(ResponseData::single(timer)))
        }
        None => IpcResponse::success(format!("No timer '{}', nothing changed", id), None),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::store::{ManualClock, MemoryStore, StoreConfig, TimerStore};
    use crate::types::TimerMode;

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

    fn create_handler() -> RequestHandler {
        let store = TimerStore::open(
            Box::new(MemoryStore::new()),
            Arc::new(ManualClock::new(1_000)),
            StoreConfig::default(),
        );
        RequestHandler::new(TimerService::new(store))
    }

    async fn send_raw(path: PathBuf, body: &'static str) -> IpcResponse {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut stream = UnixStream::connect(&path).await.unwrap();
        stream.write_all(body.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    // ------------------------------------------------------------------------
    // IpcServer Tests
    // ------------------------------------------------------------------------

    mod ipc_server_tests {
        use super::*;

        #[tokio::test]
        async fn test_server_creation() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path);

            assert!(server.is_ok());
            assert!(socket_path.exists());
        }

        #[tokio::test]
        async fn test_server_removes_existing_socket() {
            let socket_path = create_temp_socket_path();
            std::fs::write(&socket_path, "stale").unwrap();

            assert!(IpcServer::new(&socket_path).is_ok());
        }

        #[tokio::test]
        async fn test_server_replaces_socket_of_dead_daemon() {
            let socket_path = create_temp_socket_path();
            let listener = std::os::unix::net::UnixListener::bind(&socket_path).unwrap();
            drop(listener);
            assert!(socket_path.exists());

            assert!(IpcServer::new(&socket_path).is_ok());
        }

        #[tokio::test]
        async fn test_second_server_refuses_live_socket() {
            let socket_path = create_temp_socket_path();
            let first = IpcServer::new(&socket_path).unwrap();

            let err = IpcServer::new(&socket_path).err().unwrap();
            assert!(err.to_string().contains("already running"));

            // The first daemon still owns the path.
            assert!(socket_path.exists());
            assert!(std::os::unix::net::UnixStream::connect(&socket_path).is_ok());
            drop(first);
        }

        #[tokio::test]
        async fn test_server_creates_parent_directory() {
            let dir = tempfile::tempdir().unwrap();
            let socket_path = dir.path().join("nested").join("test.sock");

            let server = IpcServer::new(&socket_path).unwrap();
            assert_eq!(server.socket_path(), socket_path);
            assert!(socket_path.parent().unwrap().exists());
        }

        #[tokio::test]
        async fn test_receive_request_list() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(br#"{"command":"list"}"#).await.unwrap();
                stream.shutdown().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();
            assert_eq!(request, IpcRequest::List);

            client.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_create() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let client = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream
                    .write_all(br#"{"command":"create","id":"pomodoro-1","mode":"break","duration":90}"#)
                    .await
                    .unwrap();
                stream.shutdown().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let request = IpcServer::receive_request(&mut stream).await.unwrap();
            assert_eq!(
                request,
                IpcRequest::Create {
                    id: "pomodoro-1".to_string(),
                    mode: TimerMode::Break,
                    duration: Some(90),
                    label: None,
                }
            );

            client.await.unwrap();
        }

        #[tokio::test]
        async fn test_receive_request_invalid_json() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                stream.write_all(b"not valid json").await.unwrap();
                stream.shutdown().await.unwrap();
            });

            let mut stream = server.accept().await.unwrap();
            let result = IpcServer::receive_request(&mut stream).await;
            assert!(matches!(result, Err(IpcError::InvalidRequest(_))));
        }

        #[tokio::test]
        async fn test_receive_request_too_large() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let mut stream = UnixStream::connect(&client_path).await.unwrap();
                let body = vec![b' '; MAX_REQUEST_SIZE + 10];
                let _ = stream.write_all(&body).await;
                let _ = stream.shutdown().await;
            });

            let mut stream = server.accept().await.unwrap();
            let result = IpcServer::receive_request(&mut stream).await;
            assert!(matches!(result, Err(IpcError::RequestTooLarge)));
        }

        #[tokio::test]
        async fn test_connection_closed() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();

            let client_path = socket_path.clone();
            let _client = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let stream = UnixStream::connect(&client_path).await.unwrap();
                drop(stream);
            });

            let mut stream = server.accept().await.unwrap();
            let result = IpcServer::receive_request(&mut stream).await;
            assert!(matches!(result, Err(IpcError::ConnectionClosed)));
        }

        #[tokio::test]
        async fn test_server_drop_cleanup() {
            let socket_path = create_temp_socket_path();
            {
                let _server = IpcServer::new(&socket_path).unwrap();
                assert!(socket_path.exists());
            }
            assert!(!socket_path.exists());
        }

        #[test]
        fn test_ipc_error_display() {
            assert_eq!(IpcError::Timeout.to_string(), "Operation timed out");
            assert!(IpcError::RequestTooLarge.to_string().contains("16384"));
        }
    }

    // ------------------------------------------------------------------------
    // RequestHandler Tests
    // ------------------------------------------------------------------------

    mod request_handler_tests {
        use super::*;

        async fn create(handler: &RequestHandler, id: &str, duration: u32) -> IpcResponse {
            handler
                .handle(IpcRequest::Create {
                    id: id.to_string(),
                    mode: TimerMode::Work,
                    duration: Some(duration),
                    label: None,
                })
                .await
        }

        #[tokio::test]
        async fn test_handle_create() {
            let handler = create_handler();
            let response = create(&handler, "pomodoro-1", 600).await;

            assert!(!response.is_error());
            let timer = &response.timers()[0];
            assert_eq!(timer.id, "pomodoro-1");
            assert_eq!(timer.time_left, 600);
            assert!(!timer.is_active);
        }

        #[tokio::test]
        async fn test_handle_create_default_duration() {
            let handler = create_handler();
            let response = handler
                .handle(IpcRequest::Create {
                    id: "b".to_string(),
                    mode: TimerMode::Break,
                    duration: None,
                    label: Some("tea".to_string()),
                })
                .await;

            let timer = &response.timers()[0];
            assert_eq!(timer.total_time, 300);
            assert_eq!(timer.label.as_deref(), Some("tea"));
        }

        #[tokio::test]
        async fn test_handle_start_and_pause() {
            let handler = create_handler();
            create(&handler, "t", 60).await;

            let started = handler
                .handle(IpcRequest::Start { id: "t".into() })
                .await;
            assert_eq!(started.message, "Started timer 't'");
            assert!(started.timers()[0].is_active);
            assert_eq!(started.timers()[0].started_at, Some(1_000));

            let paused = handler
                .handle(IpcRequest::Pause { id: "t".into() })
                .await;
            assert!(!paused.timers()[0].is_active);
            assert_eq!(paused.timers()[0].started_at, None);
        }

        #[tokio::test]
        async fn test_handle_start_finished_timer() {
            let store = TimerStore::open(
                Box::new(MemoryStore::new()),
                Arc::new(ManualClock::new(1_000)),
                StoreConfig::default(),
            );
            let service = TimerService::new(store);
            let handler = RequestHandler::new(service.clone());
            create(&handler, "t", 1).await;
            handler.handle(IpcRequest::Start { id: "t".into() }).await;
            service.tick().await;

            let response = handler
                .handle(IpcRequest::Start { id: "t".into() })
                .await;
            assert!(!response.is_error());
            assert!(response.message.contains("already finished"));
            assert!(!response.timers()[0].is_active);
            assert_eq!(response.timers()[0].time_left, 0);
        }

        #[tokio::test]
        async fn test_handle_reset_with_duration() {
            let handler = create_handler();
            create(&handler, "t", 60).await;

            let response = handler
                .handle(IpcRequest::Reset {
                    id: "t".into(),
                    duration: Some(120),
                })
                .await;
            let timer = &response.timers()[0];
            assert_eq!(timer.time_left, 120);
            assert_eq!(timer.total_time, 120);
        }

        #[tokio::test]
        async fn test_handle_label_and_delete() {
            let handler = create_handler();
            create(&handler, "t", 60).await;

            let labeled = handler
                .handle(IpcRequest::Label {
                    id: "t".into(),
                    label: "Write report".into(),
                })
                .await;
            assert_eq!(labeled.timers()[0].label.as_deref(), Some("Write report"));

            let deleted = handler
                .handle(IpcRequest::Delete { id: "t".into() })
                .await;
            assert_eq!(deleted.message, "Deleted timer 't'");

            let list = handler.handle(IpcRequest::List).await;
            assert!(list.timers().is_empty());
        }

        #[tokio::test]
        async fn test_handle_list_sorted() {
            let handler = create_handler();
            create(&handler, "b", 60).await;
            create(&handler, "a", 60).await;

            let response = handler.handle(IpcRequest::List).await;
            let ids: Vec<&str> = response.timers().iter().map(|t| t.id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b"]);
        }

        #[tokio::test]
        async fn test_handle_unknown_id_is_noop() {
            let handler = create_handler();

            for request in [
                IpcRequest::Start { id: "ghost".into() },
                IpcRequest::Pause { id: "ghost".into() },
                IpcRequest::Delete { id: "ghost".into() },
                IpcRequest::Get { id: "ghost".into() },
            ] {
                let response = handler.handle(request).await;
                assert!(!response.is_error());
                assert!(response.data.is_none());
                assert!(response.message.contains("nothing changed"));
            }
        }

        #[tokio::test]
        async fn test_handle_empty_id_rejected() {
            let handler = create_handler();
            let response = handler
                .handle(IpcRequest::Start { id: "  ".into() })
                .await;
            assert!(response.is_error());
        }
    }

    // ------------------------------------------------------------------------
    // serve_connection Tests
    // ------------------------------------------------------------------------

    mod serve_connection_tests {
        use super::*;

        #[tokio::test]
        async fn test_full_ipc_flow() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();
            let handler = create_handler();

            let client = tokio::spawn(send_raw(
                socket_path.clone(),
                r#"{"command":"create","id":"p","mode":"work","duration":30,"label":"Focus"}"#,
            ));
            let stream = server.accept().await.unwrap();
            serve_connection(stream, &handler).await.unwrap();

            let response = client.await.unwrap();
            assert_eq!(response.status, "success");
            assert_eq!(response.timers()[0].label.as_deref(), Some("Focus"));

            let client = tokio::spawn(send_raw(socket_path.clone(), r#"{"command":"list"}"#));
            let stream = server.accept().await.unwrap();
            serve_connection(stream, &handler).await.unwrap();

            assert_eq!(client.await.unwrap().timers().len(), 1);
        }

        #[tokio::test]
        async fn test_malformed_request_gets_error_response() {
            let socket_path = create_temp_socket_path();
            let server = IpcServer::new(&socket_path).unwrap();
            let handler = create_handler();

            let client = tokio::spawn(send_raw(socket_path.clone(), r#"{"command":"explode"}"#));
            let stream = server.accept().await.unwrap();
            serve_connection(stream, &handler).await.unwrap();

            let response = client.await.unwrap();
            assert!(response.is_error());
            assert!(response.message.starts_with("Invalid request"));
        }
    }
}
