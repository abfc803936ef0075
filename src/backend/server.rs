//! Local WebSocket backend.
//!
//! Accepts client connections one task per connection, decodes each frame
//! and answers through a responder closure.
//!
//! # Connection Flow
//!
//! 1. Bind to `127.0.0.1:0` (random port)
//! 2. Client connects to [`LoopbackBackend::url`]
//! 3. Each text message is base64-decoded and image-decoded
//! 4. Decodable frames go to the responder; undecodable ones are skipped
//!    without a reply
//! 5. The responder's [`Reply`] is written back, or the connection closed

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Verdict;

// ============================================================================
// Types
// ============================================================================

/// One decoded frame handed to a responder.
#[derive(Debug, Clone)]
pub struct FrameReceipt {
    /// Connection number, starting at 1.
    pub connection: u64,
    /// Frame number within the connection, starting at 1.
    pub index: u64,
    /// Compressed frame bytes as received.
    pub bytes: Vec<u8>,
    /// Decoded dimensions (width, height).
    pub dimensions: (u32, u32),
}

/// What the backend does after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send this text message.
    Text(String),
    /// Send nothing.
    Silence,
    /// Close the connection.
    Close,
}

impl Reply {
    /// Serializes a verdict into a text reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn verdict(verdict: &Verdict) -> Result<Self> {
        Ok(Self::Text(serde_json::to_string(verdict)?))
    }
}

/// Shared per-frame callback.
type Responder = Arc<dyn Fn(&FrameReceipt) -> Reply + Send + Sync>;

/// Counters shared with connection tasks.
#[derive(Debug, Default)]
struct BackendStats {
    connections: AtomicU64,
    frames: AtomicU64,
    decoded: AtomicU64,
}

// ============================================================================
// LoopbackBackend
// ============================================================================

/// Inference backend stand-in listening on localhost.
///
/// Dropping the backend stops accepting; open connections end when their
/// client leaves.
///
/// # Example
///
/// ```ignore
/// use safety_stream::backend::{LoopbackBackend, Reply};
///
/// let backend = LoopbackBackend::bind(|frame| {
///     Reply::Text(format!(r#"{{"status": "idle", "message": "frame {}"}}"#, frame.index))
/// })
/// .await?;
/// println!("backend at {}", backend.ws_url());
/// ```
pub struct LoopbackBackend {
    /// Port the server is bound to.
    port: u16,
    /// Counters.
    stats: Arc<BackendStats>,
    /// Accept loop task.
    accept_task: JoinHandle<()>,
}

impl LoopbackBackend {
    /// Binds to `127.0.0.1` on a random port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind<F>(responder: F) -> Result<Self>
    where
        F: Fn(&FrameReceipt) -> Reply + Send + Sync + 'static,
    {
        Self::bind_addr(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, responder).await
    }

    /// Binds to a specific address and port (0 for random).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind_addr<F>(ip: IpAddr, port: u16, responder: F) -> Result<Self>
    where
        F: Fn(&FrameReceipt) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let actual_port = listener.local_addr()?.port();
        let stats = Arc::new(BackendStats::default());

        debug!(port = actual_port, "Backend bound");

        let accept_task = tokio::spawn(Self::accept_loop(
            listener,
            Arc::new(responder),
            Arc::clone(&stats),
        ));

        Ok(Self {
            port: actual_port,
            stats,
            accept_task,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the WebSocket URL as a string.
    ///
    /// Format: `ws://127.0.0.1:{port}/ws`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Returns the WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL does not parse.
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.ws_url()).map_err(|e| Error::config(format!("invalid backend URL: {e}")))
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.port)
    }

    /// Connections accepted so far.
    #[inline]
    #[must_use]
    pub fn connections(&self) -> u64 {
        self.stats.connections.load(Ordering::Acquire)
    }

    /// Frame messages received so far, decodable or not.
    #[inline]
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.stats.frames.load(Ordering::Acquire)
    }

    /// Frames that decoded as images.
    #[inline]
    #[must_use]
    pub fn frames_decoded(&self) -> u64 {
        self.stats.decoded.load(Ordering::Acquire)
    }

    /// Stops accepting new connections.
    pub fn shutdown(&self) {
        self.accept_task.abort();
    }

    async fn accept_loop(listener: TcpListener, responder: Responder, stats: Arc<BackendStats>) {
        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Backend accept failed");
                    continue;
                }
            };

            let connection = stats.connections.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(?addr, connection, "Backend TCP connection accepted");

            tokio::spawn(Self::serve(
                stream,
                connection,
                Arc::clone(&responder),
                Arc::clone(&stats),
            ));
        }
    }

    async fn serve(stream: TcpStream, connection: u64, responder: Responder, stats: Arc<BackendStats>) {
        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(error = %e, connection, "WebSocket upgrade failed");
                return;
            }
        };

        info!(connection, "Client connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut index = 0u64;

        while let Some(message) = ws_read.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!(error = %e, connection, "Client read failed");
                    break;
                }
            };

            stats.frames.fetch_add(1, Ordering::AcqRel);

            let Some(bytes) = decode_frame_text(text.as_str()) else {
                warn!(connection, "Skipping frame that is not base64");
                continue;
            };
            let dimensions = match image::load_from_memory(&bytes) {
                Ok(decoded) => (decoded.width(), decoded.height()),
                Err(e) => {
                    warn!(error = %e, connection, "Skipping undecodable frame");
                    continue;
                }
            };

            stats.decoded.fetch_add(1, Ordering::AcqRel);
            index += 1;

            let receipt = FrameReceipt {
                connection,
                index,
                bytes,
                dimensions,
            };

            match responder(&receipt) {
                Reply::Text(body) => {
                    trace!(connection, index, "Replying");
                    if ws_write.send(Message::Text(body.into())).await.is_err() {
                        break;
                    }
                }
                Reply::Silence => {}
                Reply::Close => {
                    debug!(connection, index, "Responder closed connection");
                    let _ = ws_write.close().await;
                    break;
                }
            }
        }

        info!(connection, "Client disconnected");
    }
}

impl Drop for LoopbackBackend {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

/// Strips an optional `data:...;base64,` prefix and decodes.
fn decode_frame_text(text: &str) -> Option<Vec<u8>> {
    let encoded = match text.split_once(',') {
        Some((_, encoded)) => encoded,
        None => text,
    };
    Base64Standard.decode(encoded.trim()).ok()
}

// ============================================================================
// Tests
// ============================================================================
