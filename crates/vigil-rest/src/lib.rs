//! # vigil-rest
//!
//! Outbound HTTP collaborators and alert delivery.
//!
//! | Piece                | Module      | Endpoint                                   |
//! |----------------------|-------------|--------------------------------------------|
//! | [`Notifier`]         | `telegram`  | `POST /bot<token>/sendMessage`             |
//! | [`ReferenceSource`]  | `binance`   | `GET /fapi/v1/ticker/24hr`, `/api/v3/...`  |
//! | Alert text           | `format`    | —                                          |
//! | Alert delivery loop  | `dispatch`  | —                                          |
//!
//! Both collaborators are traits so the dispatcher can be exercised without
//! network access.

pub mod binance;
pub mod dispatch;
pub mod format;
pub mod telegram;

use async_trait::async_trait;
use vigil_core::error::VigilError;
use vigil_core::{ReferenceSnapshot, Segment};

pub use dispatch::{AlertDispatcher, DispatchStats};
pub use format::AlertFormatter;

/// Best-effort text delivery to the notification channel.
///
/// Implementations log failures themselves; callers only learn whether the
/// message was accepted and never retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> bool;
}

/// Point-in-time 24h statistics lookup for one symbol.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_24h(&self, segment: Segment, symbol: &str) -> Result<ReferenceSnapshot, VigilError>;
}
