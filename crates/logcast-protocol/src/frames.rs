use chrono::{DateTime, Utc};
use logcast_core::LogRecord;
use serde::{Deserialize, Serialize};

/// Server → subscriber push of one log record.
/// Wire: `{ "id": 1, "timestamp": "...", "source": "...", "severity": "...", "message": "...", "ip_address": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFrame {
    /// Absent until the record has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// RFC 3339 / ISO-8601, UTC.
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub severity: String,
    pub message: String,
    pub ip_address: String,
}

impl From<&LogRecord> for LogFrame {
    fn from(rec: &LogRecord) -> Self {
        Self {
            id: rec.id(),
            timestamp: rec.timestamp(),
            source: rec.source().to_string(),
            severity: rec.severity().to_string(),
            message: rec.message().to_string(),
            ip_address: rec.ip_address().to_string(),
        }
    }
}

impl LogFrame {
    /// Rebuild the domain record, keeping the id if the frame carried one.
    pub fn into_record(self) -> LogRecord {
        let rec = LogRecord::at(
            self.timestamp,
            self.source,
            self.severity,
            self.message,
            self.ip_address,
        );
        match self.id {
            Some(id) => rec.with_id(id),
            None => rec,
        }
    }
}

/// Serialize a record into its broadcast payload.
pub fn encode(rec: &LogRecord) -> serde_json::Result<String> {
    serde_json::to_string(&LogFrame::from(rec))
}

/// Parse a broadcast payload.
pub fn decode(payload: &str) -> serde_json::Result<LogFrame> {
    serde_json::from_str(payload)
}
