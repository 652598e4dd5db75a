use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use logcast_broadcast::BroadcastDispatcher;
use logcast_core::config::LogcastConfig;
use logcast_gateway::app::{self, AppState};
use logcast_producer::RandomLogGenerator;
use logcast_scheduler::IngestEngine;
use logcast_store::SqliteStore;
use tracing::info;

/// Security log ingestor with live WebSocket fan-out.
#[derive(Parser, Debug)]
#[command(name = "logcast-gateway", version, about)]
struct Args {
    /// Path to logcast.toml (falls back to LOGCAST_CONFIG, then ./logcast.toml).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "logcast_core=info,logcast_gateway=info,logcast_scheduler=info,logcast_broadcast=info,logcast_store=info,tower_http=info"
                    .into()
            }),
        )
        .init();

    let args = Args::parse();
    info!("starting logcast log ingestor");

    // any failure before the ingest loop starts is fatal
    let config = LogcastConfig::load(args.config.as_deref()).context("failed to load config")?;

    let store = SqliteStore::open(&config.database, config.ingest.embedding_dims)
        .context("failed to open log store")?;
    info!(
        max_connections = config.database.max_connections,
        "log store ready"
    );

    let dispatcher = Arc::new(BroadcastDispatcher::new(
        Arc::new(logcast_broadcast::SubscriberRegistry::new()),
        config.broadcast.write_timeout(),
    ));
    let engine = IngestEngine::new(
        Box::new(RandomLogGenerator::new()),
        Arc::new(store),
        Arc::clone(&dispatcher) as Arc<dyn logcast_broadcast::RecordPublisher>,
        config.ingest.interval(),
    );

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port)
        .parse()
        .context("invalid gateway bind address")?;
    let state = Arc::new(AppState::new(config, dispatcher, engine.stats()));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        "WebSocket server running on {}{}",
        addr, state.config.gateway.ws_path
    );

    // spawn ingest loop in background
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let ingest = tokio::spawn(engine.run(shutdown_rx));

    app::serve(listener, state, shutdown_signal()).await?;

    // signal ingest loop to stop
    let _ = shutdown_tx.send(true);
    let _ = ingest.await;
    info!("logcast stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
