//! # vigil-md
//!
//! Market data ingestion and detection.
//!
//! ## Architecture
//!
//! ```text
//! exchange WS ─► FeedManager (one per segment)
//!                  ├─ binance::json_parser  frame → FeedEntry
//!                  ├─ AnomalyDetector       ticker → Volume / Escalation alerts
//!                  └─ LargeTradeDetector    trade  → LargeTrade alert
//!                        │
//!                        ▼
//!                   AlertSender ─► dispatcher (vigil-rest)
//! ```
//!
//! - [`feed`] — connection lifecycle, backoff, frame handling
//! - [`detector`] — detection rules over the shared symbol state
//! - [`binance`] — stream names, subscription and frame decoding
//! - [`json_util`] — JSON parsing helpers

pub mod binance;
pub mod detector;
pub mod feed;
pub mod json_util;

pub use detector::{AnomalyDetector, LargeTradeDetector};
pub use feed::{FeedExit, FeedManager, FeedSettings, FeedStats};
