use std::time::Duration;

use thiserror::Error;

/// Failure taxonomy for the transport layer.
///
/// `Protocol` failures (malformed frames) are logged and dropped at the
/// channel boundary; they never appear on the request path. `Application`
/// payloads travel inside frames and are surfaced by the session layer, not
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    /// Send attempted on a channel that is not open. A correctly sequenced
    /// caller never hits this.
    #[error("channel is not connected")]
    NotConnected,
    /// A request/response round trip exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The channel closed while a round trip was outstanding.
    #[error("channel closed")]
    Closed,
    /// Reconnect attempts exhausted; terminal until the caller re-initiates.
    #[error("reconnect attempts exhausted")]
    Connectivity,
    /// A frame could not be encoded.
    #[error("malformed frame: {0}")]
    Protocol(String),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("websocket error: {0}")]
    WebSocket(String),
}
