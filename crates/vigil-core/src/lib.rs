//! # vigil-core
//!
//! Core crate for the volume-surge alert system, providing:
//!
//! - **Types** (`types`) — segments, symbol keys, ticker/trade snapshots, alert events
//! - **Configuration** (`config`) — JSON tunables plus environment secrets
//! - **Error types** (`error`) — domain-specific `VigilError` via thiserror
//! - **Symbol state** (`store`) — shared volume histories and escalation windows
//! - **Rate limiting** (`rate_limit`) — sliding-window limiter for REST calls
//! - **WebSocket** (`ws`) — connection establishment and reconnect backoff
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limit;
pub mod store;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
