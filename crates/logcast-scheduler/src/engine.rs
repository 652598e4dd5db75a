use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use logcast_broadcast::{PublishReport, RecordPublisher};
use logcast_core::severity;
use logcast_producer::RecordProducer;
use logcast_store::LogStore;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Counters shared with the HTTP surface.
#[derive(Debug, Default)]
pub struct IngestStats {
    ingested: AtomicU64,
    persist_failures: AtomicU64,
}

impl IngestStats {
    pub fn ingested(&self) -> u64 {
        self.ingested.load(Ordering::Relaxed)
    }

    pub fn persist_failures(&self) -> u64 {
        self.persist_failures.load(Ordering::Relaxed)
    }
}

/// Drives produce → persist → broadcast on a fixed period.
pub struct IngestEngine {
    producer: Box<dyn RecordProducer>,
    store: Arc<dyn LogStore>,
    publisher: Arc<dyn RecordPublisher>,
    interval: Duration,
    stats: Arc<IngestStats>,
}

impl IngestEngine {
    pub fn new(
        producer: Box<dyn RecordProducer>,
        store: Arc<dyn LogStore>,
        publisher: Arc<dyn RecordPublisher>,
        interval: Duration,
    ) -> Self {
        Self {
            producer,
            store,
            publisher,
            interval,
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }

    /// Main loop. Ticks every `interval` until `shutdown` broadcasts `true`.
    ///
    /// Ticks run one after another, so records reach subscribers in the order
    /// they were produced.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "ingest engine started");

        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("ingest tick error: {e}");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("ingest engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One produce → persist → broadcast cycle.
    ///
    /// Returns the broadcast outcome, or the persist error when the record
    /// was dropped.
    pub async fn tick(&mut self) -> Result<PublishReport> {
        let record = self.producer.next_record();

        let id = match self.store.insert(&record).await {
            Ok(id) => id,
            Err(e) => {
                self.stats.persist_failures.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };
        let record = record.with_id(id);
        self.stats.ingested.fetch_add(1, Ordering::Relaxed);
        if severity::is_actionable(record.severity()) {
            warn!(record_id = id, ip = record.ip_address(), "ingested actionable log: {record}");
        } else {
            info!(record_id = id, "ingested log: {record}");
        }

        let report = self.publisher.publish(&record).await;
        debug!(
            record_id = id,
            delivered = report.delivered,
            dropped = report.dropped,
            "record broadcast"
        );
        Ok(report)
    }
}
