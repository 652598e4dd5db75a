// Full tick against a real SQLite store and the broadcast dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logcast_broadcast::{BroadcastDispatcher, Sink, SinkError, Subscriber, SubscriberRegistry};
use logcast_core::config::DatabaseConfig;
use logcast_producer::RandomLogGenerator;
use logcast_scheduler::{IngestEngine, SchedulerError};
use logcast_store::{SqliteStore, StoreError};
use tokio::sync::mpsc;

struct ChannelSink(mpsc::UnboundedSender<String>);

#[async_trait]
impl Sink for ChannelSink {
    async fn send(&self, payload: &str) -> Result<(), SinkError> {
        self.0
            .send(payload.to_string())
            .map_err(|e| SinkError::Write(e.to_string()))
    }
}

#[tokio::test]
async fn stored_records_reach_subscribers_with_ids() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DatabaseConfig {
        path: dir.path().join("logs.db").to_string_lossy().into_owned(),
        ..DatabaseConfig::default()
    };
    let store = Arc::new(SqliteStore::open(&cfg, 32).unwrap());

    let registry = Arc::new(SubscriberRegistry::new());
    let dispatcher = Arc::new(BroadcastDispatcher::new(
        Arc::clone(&registry),
        Duration::from_secs(1),
    ));
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.add(Arc::new(Subscriber::new(ChannelSink(tx))));

    let mut engine = IngestEngine::new(
        Box::new(RandomLogGenerator::seeded(3)),
        Arc::clone(&store) as Arc<dyn logcast_store::LogStore>,
        dispatcher,
        Duration::from_secs(2),
    );

    for expected_id in 1..=3 {
        let report = engine.tick().await.unwrap();
        assert_eq!(report.delivered, 1);
        let frame = logcast_protocol::decode(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame.id, Some(expected_id));
    }
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn unreachable_store_means_no_broadcast() {
    struct DownStore;

    #[async_trait]
    impl logcast_store::LogStore for DownStore {
        async fn insert(&self, _r: &logcast_core::LogRecord) -> logcast_store::Result<i64> {
            Err(StoreError::Closed)
        }
    }

    let registry = Arc::new(SubscriberRegistry::new());
    let dispatcher = Arc::new(BroadcastDispatcher::new(
        Arc::clone(&registry),
        Duration::from_secs(1),
    ));
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.add(Arc::new(Subscriber::new(ChannelSink(tx))));

    let mut engine = IngestEngine::new(
        Box::new(RandomLogGenerator::seeded(4)),
        Arc::new(DownStore),
        dispatcher,
        Duration::from_secs(2),
    );

    let err = engine.tick().await.unwrap_err();
    assert!(matches!(err, SchedulerError::Persist(StoreError::Closed)));
    assert!(rx.try_recv().is_err());
    assert_eq!(registry.len(), 1);
}
