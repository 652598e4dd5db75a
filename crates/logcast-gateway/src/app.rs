use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use logcast_broadcast::{BroadcastDispatcher, SubscriberRegistry};
use logcast_core::config::LogcastConfig;
use logcast_scheduler::IngestStats;
use tokio::net::TcpListener;
use tracing::info;

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
///
/// Built once at startup; the ingest engine holds clones of the dispatcher
/// and stats, the connection tasks reach the registry through here.
pub struct AppState {
    pub config: LogcastConfig,
    pub registry: Arc<SubscriberRegistry>,
    pub dispatcher: Arc<BroadcastDispatcher>,
    pub stats: Arc<IngestStats>,
}

impl AppState {
    pub fn new(
        config: LogcastConfig,
        dispatcher: Arc<BroadcastDispatcher>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            registry: Arc::clone(dispatcher.registry()),
            config,
            dispatcher,
            stats,
        }
    }

    /// Deregister every subscriber so their connection tasks wind down.
    pub fn disconnect_all(&self) -> usize {
        let mut closed = 0;
        self.registry.for_each(|sub| {
            if self.registry.remove(sub.id()).is_some() {
                closed += 1;
            }
        });
        closed
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let ws_path = state.config.gateway.ws_path.clone();
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(&ws_path, get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve the router until `shutdown` resolves, then drop all subscribers.
///
/// Peer addresses are exposed to handlers through `ConnectInfo`.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(Arc::clone(&state));
    let state_for_shutdown = Arc::clone(&state);
    let shutdown = async move {
        shutdown.await;
        let closed = state_for_shutdown.disconnect_all();
        info!(closed, "shutdown requested, subscribers disconnected");
    };

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
