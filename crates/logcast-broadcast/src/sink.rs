use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, SinkError};

/// Opaque identity of one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(Uuid);

impl SinkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound half of a subscriber connection.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one serialized record.
    async fn send(&self, payload: &str) -> Result<()>;

    /// Keepalive probe. Transports without one can rely on the default.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Best-effort graceful close.
    async fn close(&self) {}
}

/// A sink admitted to the registry.
///
/// The closed token is cancelled exactly when the registry drops the
/// subscriber; the connection task watches it to release the socket.
pub struct Subscriber {
    id: SinkId,
    peer: Option<SocketAddr>,
    sink: Box<dyn Sink>,
    closed: CancellationToken,
}

impl Subscriber {
    pub fn new(sink: impl Sink + 'static) -> Self {
        Self {
            id: SinkId::new(),
            peer: None,
            sink: Box::new(sink),
            closed: CancellationToken::new(),
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the subscriber has been deregistered.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.cancel();
    }

    /// Write to the sink unless the subscriber is already closed.
    pub async fn send(&self, payload: &str) -> Result<()> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        self.sink.send(payload).await
    }

    pub async fn ping(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        self.sink.ping().await
    }

    pub async fn close(&self) {
        self.sink.close().await
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
