//! `logcast-core`: shared types, configuration and errors for the logcast
//! ingest pipeline.

pub mod config;
pub mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{severity, LogRecord};
