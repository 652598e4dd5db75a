//! `logcast-scheduler`: the periodic ingest loop.
//!
//! Every tick the [`IngestEngine`] asks its producer for a record, persists
//! it, and only after the store has assigned an id hands it to the
//! publisher for live fan-out. A record the store rejects is logged and
//! never broadcast.

pub mod engine;
pub mod error;

pub use engine::{IngestEngine, IngestStats};
pub use error::{Result, SchedulerError};
