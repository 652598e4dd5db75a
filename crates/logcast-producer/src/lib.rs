//! `logcast-producer` manufactures the synthetic security log records the
//! ingest loop persists and broadcasts.

pub mod embedding;
pub mod generator;

pub use embedding::{format_embedding, mock_embedding};
pub use generator::{RandomLogGenerator, RecordProducer};
