//! `logcast-store`: durable row store for ingested log records.
//!
//! The ingest loop only ever needs one operation from storage: insert a
//! record and learn the identity the store assigned to it. [`LogStore`] is
//! that boundary; [`SqliteStore`] implements it on a bounded pool of SQLite
//! connections.

pub mod db;
pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{LogStore, SqliteStore};
