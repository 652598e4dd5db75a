use logcast_core::{severity, LogRecord};
use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};

const SOURCES: &[&str] = &["Firewall", "Auth", "IDS", "System", "WebApp"];

const IP_ADDRESSES: &[&str] = &[
    "203.0.113.45",
    "198.51.100.2",
    "192.0.2.88",
    "203.0.113.101",
    "198.51.100.14",
];

/// Escalated message that may replace the per-source text on CRITICAL events.
const BRUTE_FORCE_MESSAGE: &str = "Multiple brute-force attempts detected on account 'admin'";
const MESSAGE_SUFFIX: &str = " for user 'testuser'.";

/// Builds the next record for each ingest tick.
pub trait RecordProducer: Send {
    fn next_record(&mut self) -> LogRecord;
}

/// Produces randomized security events across a fixed vocabulary of
/// sources, severities and addresses.
pub struct RandomLogGenerator {
    rng: StdRng,
}

impl RandomLogGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator for tests and reproducible demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        // vocabularies are non-empty constants
        items.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

impl Default for RandomLogGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordProducer for RandomLogGenerator {
    fn next_record(&mut self) -> LogRecord {
        let source = self.pick(SOURCES);
        let level = self.pick(severity::ALL);

        let base = if level == severity::CRITICAL && self.rng.random_bool(0.5) {
            BRUTE_FORCE_MESSAGE
        } else {
            source_message(source)
        };
        let ip = self.pick(IP_ADDRESSES);

        LogRecord::new(source, level, format!("{base}{MESSAGE_SUFFIX}"), ip)
    }
}

fn source_message(source: &str) -> &'static str {
    match source {
        "Firewall" => "Blocked suspicious traffic",
        "Auth" => "Failed login attempt",
        "IDS" => "Potential SQL injection detected",
        "System" => "Service unexpectedly stopped",
        "WebApp" => "Cross-site scripting attempt",
        _ => "Unclassified security event",
    }
}
