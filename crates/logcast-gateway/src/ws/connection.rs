use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;
use logcast_broadcast::{SinkId, Subscriber, SubscriberRegistry};
use tokio::time::{sleep_until, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::ws::sink::WsSink;

/// Why a connected subscriber left the registry.
#[derive(Debug)]
pub enum CloseReason {
    PeerClosed,
    ReadError(String),
    IdleTimeout,
    PingFailed(String),
    /// The dispatcher dropped the sink after a failed or slow write.
    Deregistered,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed"),
            CloseReason::ReadError(e) => write!(f, "read error: {e}"),
            CloseReason::IdleTimeout => write!(f, "idle timeout"),
            CloseReason::PingFailed(e) => write!(f, "heartbeat failed: {e}"),
            CloseReason::Deregistered => write!(f, "dropped by broadcaster"),
        }
    }
}

/// Keeps a subscriber registered for exactly as long as it is alive.
///
/// Dropping the guard deregisters the subscriber, so every exit from the
/// connection task (close, error, panic) releases the registry entry.
struct Registration<'a> {
    registry: &'a SubscriberRegistry,
    id: SinkId,
}

impl<'a> Registration<'a> {
    fn new(registry: &'a SubscriberRegistry, subscriber: Arc<Subscriber>) -> Self {
        let id = subscriber.id();
        registry.add(subscriber);
        Self { registry, id }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

/// Axum handler: upgrades HTTP to WebSocket at the configured path.
///
/// Requests that are not valid upgrades are rejected before any state is
/// created.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(%peer, reason = %rejection.body_text(), "WebSocket upgrade rejected");
            return rejection.into_response();
        }
    };

    let max_payload = state.config.broadcast.max_payload_bytes;
    ws.max_message_size(max_payload)
        .max_frame_size(max_payload)
        .on_failed_upgrade(move |e| warn!(%peer, error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| run_connection(socket, peer, state))
}

/// Per-connection task: lives for the entire WS session.
///
/// The write half goes into the registry; this task keeps the read half as
/// a liveness probe. Inbound payloads are ignored, but any inbound frame
/// (including pongs to our heartbeat) counts as a sign of life.
async fn run_connection(socket: WebSocket, peer: SocketAddr, state: Arc<AppState>) {
    let (tx, mut rx) = socket.split();
    let subscriber = Arc::new(Subscriber::new(WsSink::new(tx)).with_peer(peer));
    let sink_id = subscriber.id();

    let registration = Registration::new(&state.registry, Arc::clone(&subscriber));
    info!(
        sink_id = %sink_id,
        %peer,
        subscribers = state.registry.len(),
        "client connected via WebSocket"
    );

    let cfg = &state.config.broadcast;
    let write_timeout = cfg.write_timeout();
    let idle_timeout = cfg.idle_timeout();

    let mut heartbeat =
        tokio::time::interval_at(Instant::now() + cfg.heartbeat_interval(), cfg.heartbeat_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let idle = sleep_until(Instant::now() + idle_timeout);
    tokio::pin!(idle);

    let reason = loop {
        tokio::select! {
            msg = rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break CloseReason::PeerClosed,
                Some(Ok(_)) => idle.as_mut().reset(Instant::now() + idle_timeout),
                Some(Err(e)) => break CloseReason::ReadError(e.to_string()),
            },

            _ = heartbeat.tick() => {
                match timeout(write_timeout, subscriber.ping()).await {
                    Ok(Ok(())) => debug!(sink_id = %sink_id, "heartbeat sent"),
                    Ok(Err(e)) => break CloseReason::PingFailed(e.to_string()),
                    Err(_) => break CloseReason::PingFailed("timed out".to_string()),
                }
            }

            _ = &mut idle => break CloseReason::IdleTimeout,

            _ = subscriber.closed() => break CloseReason::Deregistered,
        }
    };

    drop(registration);
    let _ = timeout(write_timeout, subscriber.close()).await;
    info!(
        sink_id = %sink_id,
        %peer,
        %reason,
        subscribers = state.registry.len(),
        "client disconnected"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use logcast_broadcast::{Sink, SinkError};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    struct NullSink;

    #[async_trait]
    impl Sink for NullSink {
        async fn send(&self, _payload: &str) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn registration_releases_entry_on_drop() {
        let registry = SubscriberRegistry::new();
        let subscriber = Arc::new(Subscriber::new(NullSink));
        {
            let _reg = Registration::new(&registry, Arc::clone(&subscriber));
            assert!(registry.contains(subscriber.id()));
        }
        assert!(registry.is_empty());
        assert!(subscriber.is_closed());
    }

    #[test]
    fn registration_releases_entry_when_task_panics() {
        let registry = SubscriberRegistry::new();
        let subscriber = Arc::new(Subscriber::new(NullSink));

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _reg = Registration::new(&registry, Arc::clone(&subscriber));
            assert_eq!(registry.len(), 1);
            panic!("connection task blew up");
        }));

        assert!(outcome.is_err());
        assert!(registry.is_empty());
        assert!(subscriber.is_closed());
    }
}
