//! Typed error definitions for the alerting system.
//!
//! [`VigilError`] classifies failures by origin so callers can apply the
//! right policy (reconnect, drop the frame, skip the alert, abort startup).
//! All variants implement `std::error::Error` via `thiserror`, so they
//! integrate with `anyhow::Result` in the binaries.

use thiserror::Error;

/// Domain-specific errors.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Configuration parsing or validation error, including missing secrets.
    #[error("config error: {0}")]
    Config(String),

    /// WebSocket connection, handshake, or communication error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// No frame (or no subscription ack) within the allowed time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Inbound frame or REST response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// REST request failed or returned a non-success status.
    #[error("http error: {0}")]
    Http(String),

    /// Notification delivery failed.
    #[error("notify error: {0}")]
    Notify(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for VigilError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}

impl From<serde_json::Error> for VigilError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
