//! `logcast-gateway`: the HTTP/WebSocket front of the ingest pipeline.
//!
//! Viewers connect at `GET /ws` (configurable) and receive every persisted
//! log record as a JSON text frame. `GET /health` reports liveness and
//! pipeline counters.

pub mod app;
pub mod http;
pub mod ws;
