//! `logcast-broadcast`: live fan-out of ingested records to connected
//! subscribers.
//!
//! # Overview
//!
//! | Type                    | Role                                                  |
//! |-------------------------|-------------------------------------------------------|
//! | [`Sink`]                | Outbound channel to one subscriber                    |
//! | [`Subscriber`]          | A registered sink plus its closed flag                |
//! | [`SubscriberRegistry`]  | Concurrency-safe set of live subscribers              |
//! | [`BroadcastDispatcher`] | Serializes a record once and writes it to every sink  |
//!
//! Sinks that fail a write, or do not accept it within the configured write
//! timeout, are removed from the registry during the same pass.

pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod sink;

pub use dispatcher::{BroadcastDispatcher, PublishReport, RecordPublisher};
pub use error::{Result, SinkError};
pub use registry::SubscriberRegistry;
pub use sink::{Sink, SinkId, Subscriber};
