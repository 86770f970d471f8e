//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! engine events to subscribed clients. Every request goes through the
//! engine handle; the server holds no hotkey state of its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::bindings::BindingChange;
use crate::engine::{EngineError, EngineHandle};
use crate::events::ToggleEvent;

use super::protocol::{BindingsView, DaemonStatus, Notification, Request, Response};

/// Largest accepted request body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    context: Arc<ClientContext>,
    shutdown_tx: broadcast::Sender<()>,
}

/// What every client handler needs
struct ClientContext {
    engine: EngineHandle,
    events: broadcast::Sender<ToggleEvent>,
    hotkeys_enabled: bool,
    start_time: Instant,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        engine: EngineHandle,
        events: broadcast::Sender<ToggleEvent>,
        hotkeys_enabled: bool,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            context: Arc::new(ClientContext {
                engine,
                events,
                hotkeys_enabled,
                start_time: Instant::now(),
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Handle a single client connection
///
/// Frames are read on a separate task so a pushed notification never
/// interrupts a half-read request.
async fn handle_client(stream: UnixStream, context: Arc<ClientContext>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (request_tx, mut request_rx) = mpsc::channel(8);
    let reader_task = tokio::spawn(read_requests(reader, request_tx));
    let mut subscription: Option<broadcast::Receiver<ToggleEvent>> = None;

    let result = async {
        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    let response = match request {
                        Ok(request) => {
                            debug!(?request, "received request");
                            if matches!(request, Request::Subscribe) && subscription.is_none() {
                                subscription = Some(context.events.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            context.process_request(request).await
                        }
                        Err(message) => Response::error("bad_request", message),
                    };
                    send_message(&mut writer, &response).await?;
                }
                event = next_event(&mut subscription) => {
                    match event {
                        Ok(event) => {
                            send_message(&mut writer, &Notification::Event { event }).await?;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(skipped = n, "event subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            subscription = None;
                        }
                    }
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    reader_task.abort();
    result
}

/// Read length-prefixed requests until the client goes away
async fn read_requests(
    mut reader: OwnedReadHalf,
    requests: mpsc::Sender<Result<Request, String>>,
) {
    let mut len_buf = [0u8; 4];

    loop {
        // Read message length (4-byte little-endian)
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("client disconnected");
                return;
            }
            Err(e) => {
                warn!(?e, "client read error");
                return;
            }
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_LEN {
            warn!(len, "message too large, disconnecting");
            return;
        }

        let mut msg_buf = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut msg_buf).await {
            warn!(?e, "client read error");
            return;
        }

        let request = serde_json::from_slice(&msg_buf)
            .map_err(|e| format!("failed to parse request: {}", e));
        if requests.send(request).await.is_err() {
            return;
        }
    }
}

/// Next event for a subscribed client; never resolves otherwise
async fn next_event(
    subscription: &mut Option<broadcast::Receiver<ToggleEvent>>,
) -> Result<ToggleEvent, broadcast::error::RecvError> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

impl ClientContext {
    /// Process a request and return a response
    async fn process_request(&self, request: Request) -> Response {
        match self.try_process(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(?e, "request failed");
                let code = match &e {
                    EngineError::Closed => "engine_unavailable",
                    EngineError::Store(_) => "store_failed",
                };
                Response::error(code, e.to_string())
            }
        }
    }

    async fn try_process(&self, request: Request) -> Result<Response, EngineError> {
        let response = match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let snapshot = self.engine.snapshot().await?;
                Response::Status(DaemonStatus {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    hotkeys_enabled: self.hotkeys_enabled,
                    current_source: snapshot.current,
                    source_count: snapshot.sources.len(),
                    recording: snapshot.recording,
                    uptime_secs: self.start_time.elapsed().as_secs(),
                })
            }

            Request::ListSources => self.sources().await?,

            Request::RefreshSources => {
                self.engine.refresh().await?;
                self.sources().await?
            }

            Request::GetBindings => {
                Response::Bindings(BindingsView::from(self.engine.snapshot().await?))
            }

            Request::SetToggleHotkey { chord } => {
                self.update(BindingChange::ToggleHotkey { chord }).await?
            }

            Request::SetLanguageHotkey { source_id, chord } => {
                self.update(BindingChange::SourceHotkey { source_id, chord })
                    .await?
            }

            Request::SetToggleLanguages { first, second } => {
                self.update(BindingChange::ToggleSources { first, second })
                    .await?
            }

            Request::SetShowIndicator { enabled } => {
                self.update(BindingChange::ShowIndicator { enabled }).await?
            }

            Request::StartRecording { target } => {
                let events = self.events.clone();
                self.engine
                    .start_recording(
                        target,
                        Box::new(move |target, chord| {
                            let _ = events.send(ToggleEvent::BindingRecorded {
                                target: target.clone(),
                                chord,
                            });
                        }),
                    )
                    .await?;
                Response::Ack
            }

            Request::CancelRecording => {
                self.engine.cancel_recording().await?;
                Response::Ack
            }

            Request::SelectSource { id } => Response::Selected {
                source: self.engine.select(id).await?,
            },

            Request::Toggle => Response::Selected {
                source: self.engine.toggle().await?,
            },

            Request::Subscribe => Response::Subscribed,
        };

        Ok(response)
    }

    async fn sources(&self) -> Result<Response, EngineError> {
        let snapshot = self.engine.snapshot().await?;
        Ok(Response::Sources {
            sources: snapshot.sources,
            current: snapshot.current,
        })
    }

    async fn update(&self, change: BindingChange) -> Result<Response, EngineError> {
        self.engine.update(change).await?;
        Ok(Response::Ack)
    }
}
