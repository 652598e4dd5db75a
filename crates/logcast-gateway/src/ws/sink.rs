use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{stream::SplitSink, SinkExt};
use logcast_broadcast::{Sink, SinkError};
use tokio::sync::Mutex;

/// Write half of a subscriber's WebSocket.
///
/// The mutex serialises broadcast writes with heartbeat pings; it is only
/// ever held for one frame.
pub struct WsSink {
    tx: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSink {
    pub fn new(tx: SplitSink<WebSocket, Message>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

#[async_trait]
impl Sink for WsSink {
    async fn send(&self, payload: &str) -> Result<(), SinkError> {
        let mut guard = self.tx.lock().await;
        guard
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| SinkError::Write(e.to_string()))
    }

    async fn ping(&self) -> Result<(), SinkError> {
        let mut guard = self.tx.lock().await;
        guard
            .send(Message::Ping(Default::default()))
            .await
            .map_err(|e| SinkError::Write(e.to_string()))
    }

    async fn close(&self) {
        let mut guard = self.tx.lock().await;
        let _ = guard.send(Message::Close(None)).await;
        let _ = guard.close().await;
    }
}
