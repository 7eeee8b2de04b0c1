//! Visualization client: connection lifecycle and snapshot delivery.
//!
//! `VisualizationClient` owns at most one connection to the listener. It
//! connects lazily, performs one request/reply exchange per snapshot, and on a
//! transport failure reconnects and resends exactly once before giving up.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqError, ZmqMessage};

use crate::config::ClientConfig;
use crate::encoder::{encode, GraphDocument, LabelSelection};
use crate::graph::{Graph, NodeId};
use crate::trace::TraceMap;

/// Transport-level failures. All of them are recoverable by reconnecting.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not reach the listener or complete the socket handshake.
    #[error("Connection to {endpoint} failed: {source}")]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: ZmqError,
    },

    /// Connect or reply wait exceeded its deadline.
    #[error("Timed out after {millis}ms")]
    Timeout {
        /// Deadline that was exceeded
        millis: u64,
    },

    /// The reply was not a single UTF-8 text frame.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Socket failure while sending or receiving.
    #[error("Socket error: {0}")]
    Socket(#[from] ZmqError),
}

impl TransportError {
    fn timeout(limit: Duration) -> Self {
        TransportError::Timeout {
            millis: limit.as_millis() as u64,
        }
    }
}

/// Why a snapshot could not be delivered.
#[derive(Debug, Error)]
pub enum SendError {
    /// No connection could be established.
    #[error("Could not connect to visualization listener: {0}")]
    Connect(#[source] TransportError),

    /// The exchange failed, including the single retry.
    #[error("Exchange with visualization listener failed: {0}")]
    Transport(#[source] TransportError),

    /// The document could not be turned into JSON. Not retried.
    #[error("Failed to serialize graph document: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl SendError {
    /// Whether the failure came from the transport rather than the payload.
    pub fn is_transport(&self) -> bool {
        !matches!(self, SendError::Serialize(_))
    }
}

/// One open request/reply channel.
pub trait Exchange: Send {
    /// Send one request frame and wait for exactly one reply frame.
    fn exchange(
        &mut self,
        request: &str,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Release the channel. Best-effort; errors are only logged by callers.
    fn close(self) -> Result<(), TransportError>;
}

/// Opens [`Exchange`] channels to the configured listener.
pub trait Connector: Send {
    type Conn: Exchange;

    fn connect(
        &self,
        config: &ClientConfig,
    ) -> impl Future<Output = Result<Self::Conn, TransportError>> + Send;
}

/// Connector opening a ZeroMQ REQ socket to `tcp://host:port`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZmqConnector;

impl Connector for ZmqConnector {
    type Conn = ZmqTransport;

    async fn connect(&self, config: &ClientConfig) -> Result<ZmqTransport, TransportError> {
        let endpoint = config.endpoint();
        let limit = config.connect_timeout;
        let mut socket = ReqSocket::new();

        // connect() retries an unreachable peer indefinitely
        let result = timeout(limit, socket.connect(&endpoint)).await;
        match result {
            Ok(Ok(())) => Ok(ZmqTransport::new(socket, config.reply_timeout)),
            Ok(Err(source)) => Err(TransportError::ConnectionFailed { endpoint, source }),
            Err(_) => {
                debug!("Connect to {} gave up after {:?}", endpoint, limit);
                Err(TransportError::timeout(limit))
            }
        }
    }
}

/// A connected REQ socket.
///
/// Dropping it discards any unsent frame, so closing never blocks.
pub struct ZmqTransport {
    socket: ReqSocket,
    /// Bound on one request/reply exchange.
    reply_timeout: Duration,
}

impl ZmqTransport {
    pub fn new(socket: ReqSocket, reply_timeout: Duration) -> Self {
        Self {
            socket,
            reply_timeout,
        }
    }

    async fn send_receive(&mut self, request: &str) -> Result<String, TransportError> {
        self.socket.send(ZmqMessage::from(request.to_string())).await?;

        let reply = self.socket.recv().await?;
        String::try_from(reply)
            .map_err(|e| TransportError::Protocol(format!("Unreadable reply: {}", e)))
    }
}

impl Exchange for ZmqTransport {
    async fn exchange(&mut self, request: &str) -> Result<String, TransportError> {
        let limit = self.reply_timeout;
        match timeout(limit, self.send_receive(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::timeout(limit)),
        }
    }

    fn close(self) -> Result<(), TransportError> {
        drop(self.socket);
        Ok(())
    }
}

/// Client for pushing graph snapshots to a visualization listener.
///
/// # Connection Lifecycle
///
/// - Constructed disconnected; nothing happens until the first send
/// - `connect()` - open the connection (no-op when already connected)
/// - `send_graph()` - encode, send, wait for the acknowledgement
/// - `disconnect()` - close; also runs when the client is dropped
///
/// A failed exchange closes the connection, reconnects and resends once. A
/// second failure is reported as `false` and the next send starts over with a
/// fresh connection.
///
/// # Example
///
/// ```ignore
/// use graphwire::{Graph, LabelSelection, VisualizationClient};
///
/// let mut graph: Graph<&str> = Graph::directed();
/// graph.add_edge("A", "B");
///
/// let mut client = VisualizationClient::new("localhost", 8086);
/// if !client.send_graph(&graph, "Simple Graph", &LabelSelection::default(), None).await {
///     eprintln!("listener not reachable");
/// }
/// ```
pub struct VisualizationClient<C: Connector = ZmqConnector> {
    config: ClientConfig,
    connector: C,
    conn: Option<C::Conn>,
}

impl VisualizationClient {
    /// Client for the listener at `host:port` with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(ClientConfig::new(host, port))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_connector(config, ZmqConnector)
    }

    /// Client configured from `GRAPHWIRE_*` environment variables.
    pub fn from_env() -> Self {
        Self::with_config(ClientConfig::from_env())
    }
}

impl Default for VisualizationClient {
    fn default() -> Self {
        Self::with_config(ClientConfig::default())
    }
}

impl<C: Connector> VisualizationClient<C> {
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            conn: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Open the connection if needed.
    ///
    /// Returns `false` (and logs) when the listener cannot be reached.
    pub async fn connect(&mut self) -> bool {
        match self.ensure_connected().await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "Could not connect to visualization listener at {}: {}",
                    self.config.address(),
                    e
                );
                false
            }
        }
    }

    /// Encode `graph` and deliver it. Returns `true` once the listener acknowledged.
    pub async fn send_graph<N: NodeId>(
        &mut self,
        graph: &Graph<N>,
        title: &str,
        labels: &LabelSelection,
        trace: Option<&TraceMap>,
    ) -> bool {
        match self.try_send_graph(graph, title, labels, trace).await {
            Ok(_) => true,
            Err(e) => {
                error!("Error sending graph '{}': {}", title, e);
                false
            }
        }
    }

    /// Deliver an already encoded document.
    pub async fn send_document(&mut self, document: &GraphDocument) -> bool {
        match self.try_send_document(document).await {
            Ok(_) => true,
            Err(e) => {
                error!("Error sending graph '{}': {}", document.title, e);
                false
            }
        }
    }

    /// Like [`send_graph`](Self::send_graph), returning the acknowledgement
    /// text or the failure cause.
    pub async fn try_send_graph<N: NodeId>(
        &mut self,
        graph: &Graph<N>,
        title: &str,
        labels: &LabelSelection,
        trace: Option<&TraceMap>,
    ) -> Result<String, SendError> {
        self.ensure_connected().await.map_err(SendError::Connect)?;
        let document = encode(graph, title, labels, trace);
        self.deliver(&document).await
    }

    /// Like [`send_document`](Self::send_document), returning the
    /// acknowledgement text or the failure cause.
    pub async fn try_send_document(
        &mut self,
        document: &GraphDocument,
    ) -> Result<String, SendError> {
        self.ensure_connected().await.map_err(SendError::Connect)?;
        self.deliver(document).await
    }

    /// Close the connection. Safe to call any number of times.
    pub fn disconnect(&mut self) {
        if self.conn.is_some() {
            self.drop_connection();
            info!("Disconnected from visualization listener");
        }
    }

    async fn ensure_connected(&mut self) -> Result<&mut C::Conn, TransportError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                info!(
                    "Trying to connect to visualization listener at {} ...",
                    self.config.address()
                );
                let conn = self.connector.connect(&self.config).await?;
                info!("Connected to visualization listener at {}", self.config.address());
                conn
            }
        };
        Ok(self.conn.insert(conn))
    }

    async fn deliver(&mut self, document: &GraphDocument) -> Result<String, SendError> {
        let payload = match serde_json::to_string(document) {
            Ok(payload) => payload,
            Err(e) => {
                self.drop_connection();
                return Err(SendError::Serialize(e));
            }
        };
        debug!("Sending '{}' ({} bytes)", document.title, payload.len());

        let ack = match self.exchange_once(&payload).await {
            Ok(ack) => ack,
            Err(first) => {
                warn!("Exchange failed ({}), reconnecting and resending once", first);
                self.drop_connection();
                self.exchange_once(&payload).await.map_err(|e| {
                    self.drop_connection();
                    e
                })?
            }
        };

        info!("Listener response: {}", ack);
        Ok(ack)
    }

    async fn exchange_once(&mut self, payload: &str) -> Result<String, SendError> {
        let conn = self.ensure_connected().await.map_err(SendError::Connect)?;
        conn.exchange(payload).await.map_err(SendError::Transport)
    }

    fn drop_connection(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close() {
                debug!("Ignoring error while closing connection: {}", e);
            }
        }
    }
}

impl<C: Connector> Drop for VisualizationClient<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
