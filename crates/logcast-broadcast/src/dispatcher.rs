use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use logcast_core::LogRecord;
use tracing::{debug, error, warn};

use crate::error::SinkError;
use crate::registry::SubscriberRegistry;
use crate::sink::Subscriber;

/// Outcome of one broadcast pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Sinks that accepted the payload.
    pub delivered: usize,
    /// Sinks removed because the write failed or timed out.
    pub dropped: usize,
}

/// Anything the ingest loop can hand a persisted record to.
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    /// Fan `record` out to every live subscriber. Never fails: delivery
    /// problems are handled per sink.
    async fn publish(&self, record: &LogRecord) -> PublishReport;
}

/// Delivers each record to every subscriber in the registry.
///
/// Writes run concurrently and each one is bounded by `write_timeout`, so a
/// single stalled subscriber delays a pass by at most that bound. A sink
/// that errors or times out is deregistered on the spot.
pub struct BroadcastDispatcher {
    registry: Arc<SubscriberRegistry>,
    write_timeout: Duration,
}

impl BroadcastDispatcher {
    pub fn new(registry: Arc<SubscriberRegistry>, write_timeout: Duration) -> Self {
        Self {
            registry,
            write_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Deliver an already serialized payload to every live subscriber.
    pub async fn publish_raw(&self, payload: Arc<str>) -> PublishReport {
        let targets = self.registry.snapshot();
        if targets.is_empty() {
            return PublishReport::default();
        }

        let deliveries = targets
            .iter()
            // removed since the snapshot was taken
            .filter(|sub| !sub.is_closed())
            .map(|sub| {
                let payload = Arc::clone(&payload);
                async move { (sub, self.deliver(sub, &payload).await) }
            });

        let mut report = PublishReport::default();
        for (sub, outcome) in join_all(deliveries).await {
            match outcome {
                Ok(()) => report.delivered += 1,
                // remove is idempotent; only count sinks this pass actually pruned
                Err(e) => {
                    if self.registry.remove(sub.id()).is_some() {
                        warn!(sink_id = %sub.id(), peer = ?sub.peer(), error = %e, "dropping subscriber");
                        report.dropped += 1;
                    }
                }
            }
        }
        debug!(
            delivered = report.delivered,
            dropped = report.dropped,
            "broadcast pass complete"
        );
        report
    }

    async fn deliver(&self, sub: &Subscriber, payload: &str) -> Result<(), SinkError> {
        match tokio::time::timeout(self.write_timeout, sub.send(payload)).await {
            Ok(res) => res,
            Err(_) => Err(SinkError::Timeout {
                ms: self.write_timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl RecordPublisher for BroadcastDispatcher {
    async fn publish(&self, record: &LogRecord) -> PublishReport {
        // subscribers only ever see rows the store has accepted
        if !record.is_persisted() {
            error!(record = %record, "refusing to broadcast unpersisted record");
            return PublishReport::default();
        }
        let payload = match logcast_protocol::encode(record) {
            Ok(json) => Arc::<str>::from(json),
            Err(e) => {
                error!(record_id = ?record.id(), error = %e, "failed to serialize record");
                return PublishReport::default();
            }
        };
        self.publish_raw(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Result, sink::Sink};
    use logcast_core::severity;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        received: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sink for RecordingSink {
        async fn send(&self, payload: &str) -> Result<()> {
            self.received.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl Sink for FailingSink {
        async fn send(&self, _payload: &str) -> Result<()> {
            Err(SinkError::Write("connection reset by peer".to_string()))
        }
    }

    /// Transport that reports its connection as gone.
    struct GoneSink;

    #[async_trait]
    impl Sink for GoneSink {
        async fn send(&self, _payload: &str) -> Result<()> {
            Err(SinkError::Closed)
        }
    }

    struct StalledSink;

    #[async_trait]
    impl Sink for StalledSink {
        async fn send(&self, _payload: &str) -> Result<()> {
            std::future::pending().await
        }
    }

    fn dispatcher() -> BroadcastDispatcher {
        BroadcastDispatcher::new(
            Arc::new(SubscriberRegistry::new()),
            Duration::from_millis(500),
        )
    }

    fn join(d: &BroadcastDispatcher, sink: impl Sink + 'static) -> Arc<Subscriber> {
        let sub = Arc::new(Subscriber::new(sink));
        assert!(d.registry().add(Arc::clone(&sub)));
        sub
    }

    fn record(id: i64) -> LogRecord {
        LogRecord::new("Firewall", severity::WARNING, "Blocked suspicious traffic", "192.0.2.88")
            .with_id(id)
    }

    #[tokio::test]
    async fn empty_registry_is_a_noop() {
        let d = dispatcher();
        assert_eq!(d.publish(&record(1)).await, PublishReport::default());
    }

    #[tokio::test]
    async fn unpersisted_record_is_not_broadcast() {
        let d = dispatcher();
        let sink = RecordingSink::default();
        join(&d, sink.clone());

        let draft = LogRecord::new("Auth", severity::CRITICAL, "Failed login attempt", "192.0.2.88");
        assert_eq!(d.publish(&draft).await, PublishReport::default());
        assert!(sink.messages().is_empty());
        assert_eq!(d.registry().len(), 1);
    }

    #[tokio::test]
    async fn every_sink_gets_identical_bytes() {
        let d = dispatcher();
        let sinks: Vec<RecordingSink> = (0..5).map(|_| RecordingSink::default()).collect();
        for s in &sinks {
            join(&d, s.clone());
        }

        let rec = record(11);
        let report = d.publish(&rec).await;
        assert_eq!(report, PublishReport { delivered: 5, dropped: 0 });

        let expected = logcast_protocol::encode(&rec).unwrap();
        for s in &sinks {
            assert_eq!(s.messages(), vec![expected.clone()]);
        }
    }

    #[tokio::test]
    async fn failing_sink_is_pruned_without_affecting_others() {
        let d = dispatcher();
        let healthy: Vec<RecordingSink> = (0..3).map(|_| RecordingSink::default()).collect();
        for s in &healthy {
            join(&d, s.clone());
        }
        let bad = join(&d, FailingSink);

        let report = d.publish(&record(1)).await;
        assert_eq!(report, PublishReport { delivered: 3, dropped: 1 });
        assert!(!d.registry().contains(bad.id()));
        assert!(bad.is_closed());

        let report = d.publish(&record(2)).await;
        assert_eq!(report, PublishReport { delivered: 3, dropped: 0 });
        for s in &healthy {
            assert_eq!(s.messages().len(), 2);
        }
    }

    #[tokio::test]
    async fn sink_reporting_closed_connection_is_pruned() {
        let d = dispatcher();
        let healthy = RecordingSink::default();
        join(&d, healthy.clone());
        let gone = join(&d, GoneSink);

        let report = d.publish(&record(7)).await;
        assert_eq!(report, PublishReport { delivered: 1, dropped: 1 });
        assert!(!d.registry().contains(gone.id()));
        assert!(gone.is_closed());

        let report = d.publish(&record(8)).await;
        assert_eq!(report, PublishReport { delivered: 1, dropped: 0 });
        assert_eq!(d.registry().len(), 1);
        assert_eq!(healthy.messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sink_is_dropped_after_timeout() {
        let d = dispatcher();
        let healthy = RecordingSink::default();
        join(&d, healthy.clone());
        let stalled = join(&d, StalledSink);

        let started = tokio::time::Instant::now();
        let report = d.publish(&record(5)).await;

        assert_eq!(report, PublishReport { delivered: 1, dropped: 1 });
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!d.registry().contains(stalled.id()));
        assert_eq!(healthy.messages().len(), 1);
    }

    #[tokio::test]
    async fn removed_subscriber_is_not_written() {
        let d = dispatcher();
        let gone = RecordingSink::default();
        let stays = RecordingSink::default();
        let gone_sub = join(&d, gone.clone());
        join(&d, stays.clone());

        d.registry().remove(gone_sub.id());
        // a write attempted after removal is refused by the subscriber itself
        assert!(matches!(gone_sub.send("x").await, Err(SinkError::Closed)));

        let report = d.publish(&record(3)).await;
        assert_eq!(report.delivered, 1);
        assert!(gone.messages().is_empty());
        assert_eq!(stays.messages().len(), 1);
    }
}
