use chrono::{DateTime, Utc};
use std::fmt;

/// Severity vocabulary used by producers and downstream consumers.
pub mod severity {
    pub const INFO: &str = "INFO";
    pub const WARNING: &str = "WARNING";
    pub const ALERT: &str = "ALERT";
    pub const CRITICAL: &str = "CRITICAL";

    /// All known levels, lowest first.
    pub const ALL: &[&str] = &[INFO, WARNING, ALERT, CRITICAL];

    /// Levels an incident agent reacts to.
    pub fn is_actionable(severity: &str) -> bool {
        severity == ALERT || severity == CRITICAL
    }
}

/// One security log event.
///
/// A record starts life without an id. The store assigns one on insert and
/// [`LogRecord::with_id`] produces the persisted value; there is no way to
/// change the id (or any other field) afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    id: Option<i64>,
    timestamp: DateTime<Utc>,
    source: String,
    severity: String,
    message: String,
    ip_address: String,
}

impl LogRecord {
    /// New unpersisted record stamped with the current time.
    pub fn new(
        source: impl Into<String>,
        severity: impl Into<String>,
        message: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self::at(Utc::now(), source, severity, message, ip_address)
    }

    /// New unpersisted record with an explicit timestamp.
    pub fn at(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        severity: impl Into<String>,
        message: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp,
            source: source.into(),
            severity: severity.into(),
            message: message.into(),
            ip_address: ip_address.into(),
        }
    }

    /// Attach the store-assigned identity.
    ///
    /// Consumes the record so a persisted value can only be produced once
    /// from an unpersisted one.
    pub fn with_id(self, id: i64) -> Self {
        debug_assert!(self.id.is_none(), "record already persisted");
        Self {
            id: Some(id),
            ..self
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn severity(&self) -> &str {
        &self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.severity, self.source, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_unpersisted() {
        let rec = LogRecord::new("Auth", severity::CRITICAL, "Failed login", "198.51.100.2");
        assert_eq!(rec.id(), None);
        assert!(!rec.is_persisted());
        assert_eq!(rec.source(), "Auth");
        assert_eq!(rec.ip_address(), "198.51.100.2");
    }

    #[test]
    fn with_id_keeps_fields() {
        let rec = LogRecord::new("IDS", severity::ALERT, "probe", "192.0.2.88");
        let ts = rec.timestamp();
        let persisted = rec.with_id(7);
        assert_eq!(persisted.id(), Some(7));
        assert_eq!(persisted.timestamp(), ts);
        assert_eq!(persisted.severity(), "ALERT");
    }

    #[test]
    fn display_matches_ingest_log_line() {
        let rec = LogRecord::new("Firewall", severity::INFO, "Blocked", "203.0.113.45");
        assert_eq!(rec.to_string(), "[INFO] Firewall - Blocked");
    }

    #[test]
    fn actionable_levels() {
        assert!(severity::is_actionable("CRITICAL"));
        assert!(severity::is_actionable("ALERT"));
        assert!(!severity::is_actionable("WARNING"));
        assert!(!severity::is_actionable("INFO"));
    }
}
