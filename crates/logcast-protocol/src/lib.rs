//! Wire format for records pushed to live subscribers.
//!
//! Each broadcast message is a single flat JSON object (no envelope, no
//! sequence number, no acknowledgement):
//!
//! ```json
//! {"id":42,"timestamp":"2024-05-01T12:00:00.123456Z","source":"Auth",
//!  "severity":"CRITICAL","message":"...","ip_address":"198.51.100.2"}
//! ```

pub mod frames;

pub use frames::{decode, encode, LogFrame};
