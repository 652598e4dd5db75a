use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_WS_PATH: &str = "/ws";
pub const DEFAULT_CONFIG_FILE: &str = "logcast.toml";
pub const DEFAULT_DB_PATH: &str = "logcast.db";
pub const DEFAULT_MAX_CONNECTIONS: usize = 10; // store connection cap
pub const DEFAULT_INGEST_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_EMBEDDING_DIMS: usize = 768;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 2_000; // per-sink write bound
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 90; // no inbound traffic => dead peer
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Top-level config (logcast.toml + LOGCAST_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogcastConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upgrade path subscribers connect to.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            ws_path: default_ws_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Upper bound on concurrently open store connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// SQLite busy handler timeout.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Bound on a single store operation, including waiting for a connection.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Length of the opaque vector column written with each row.
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            embedding_dims: default_embedding_dims(),
        }
    }
}

impl IngestConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// A sink that cannot take a message within this bound is dropped.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: default_write_timeout_ms(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl BroadcastConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_ws_path() -> String {
    DEFAULT_WS_PATH.to_string()
}
fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}
fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}
fn default_busy_timeout_ms() -> u64 {
    5_000
}
fn default_op_timeout_ms() -> u64 {
    5_000
}
fn default_interval_secs() -> u64 {
    DEFAULT_INGEST_INTERVAL_SECS
}
fn default_embedding_dims() -> usize {
    DEFAULT_EMBEDDING_DIMS
}
fn default_write_timeout_ms() -> u64 {
    DEFAULT_WRITE_TIMEOUT_MS
}
fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}
fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}
fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

impl LogcastConfig {
    /// Load config from a TOML file with LOGCAST_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument (must exist)
    ///   2. `LOGCAST_CONFIG` env var (must exist)
    ///   3. ./logcast.toml (optional; built-in defaults when absent)
    ///
    /// Nested keys are separated by a double underscore in env overrides,
    /// e.g. `LOGCAST_DATABASE__MAX_CONNECTIONS=4`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let explicit = config_path
            .map(String::from)
            .or_else(|| std::env::var("LOGCAST_CONFIG").ok());

        let path = match explicit {
            Some(p) => {
                if !Path::new(&p).is_file() {
                    return Err(CoreError::Config(format!("config file not found: {p}")));
                }
                p
            }
            None => DEFAULT_CONFIG_FILE.to_string(),
        };
        tracing::info!(path = %path, "loading config");

        let config: LogcastConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("LOGCAST_").ignore(&["config"]).split("__"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or disable the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.ws_path.is_empty() || !self.gateway.ws_path.starts_with('/') {
            return Err(CoreError::invalid("gateway.ws_path", "must start with '/'"));
        }
        if self.database.path.trim().is_empty() {
            return Err(CoreError::invalid("database.path", "must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(CoreError::invalid("database.max_connections", "must be > 0"));
        }
        if self.database.op_timeout_ms == 0 {
            return Err(CoreError::invalid("database.op_timeout_ms", "must be > 0"));
        }
        if self.ingest.interval_secs == 0 {
            return Err(CoreError::invalid("ingest.interval_secs", "must be > 0"));
        }
        if self.ingest.embedding_dims == 0 {
            return Err(CoreError::invalid("ingest.embedding_dims", "must be > 0"));
        }
        let b = &self.broadcast;
        if b.write_timeout_ms == 0 {
            return Err(CoreError::invalid("broadcast.write_timeout_ms", "must be > 0"));
        }
        if b.heartbeat_interval_secs == 0 {
            return Err(CoreError::invalid("broadcast.heartbeat_interval_secs", "must be > 0"));
        }
        if b.idle_timeout_secs <= b.heartbeat_interval_secs {
            return Err(CoreError::invalid(
                "broadcast.idle_timeout_secs",
                format!(
                    "must exceed heartbeat_interval_secs ({})",
                    b.heartbeat_interval_secs
                ),
            ));
        }
        if b.max_payload_bytes == 0 {
            return Err(CoreError::invalid("broadcast.max_payload_bytes", "must be > 0"));
        }
        Ok(())
    }
}
