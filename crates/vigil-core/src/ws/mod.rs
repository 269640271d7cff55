//! WebSocket transport and reconnect policy.

pub mod backoff;
pub mod client;

pub use backoff::Backoff;
pub use client::{Connector, WsConnector, WsStream};
