//! Market data structs decoded from the exchange stream.
//!
//! These are ephemeral: produced by the frame decoder, consumed immediately
//! by a detector, then dropped.

use super::enums::Segment;

/// One entry of the all-market 24h ticker stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerSnapshot {
    pub symbol: String,
    /// Last traded price.
    pub last_price: f64,
    /// 24h price change, in percent.
    pub price_change_pct: f64,
    /// 24h volume in the quote asset.
    pub quote_volume_24h: f64,
}

/// One aggregate trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePrint {
    pub symbol: String,
    pub price: f64,
    pub qty: f64,
    /// `true` when the buyer was the resting (maker) side, i.e. a taker sell.
    pub is_buyer_maker: bool,
}

impl TradePrint {
    /// Trade value in the quote asset.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }
}

/// A decoded feed entry of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEntry {
    Ticker(TickerSnapshot),
    Trade(TradePrint),
}

/// 24h statistics for one symbol, as returned by the reference-data REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSnapshot {
    pub segment: Segment,
    pub symbol: String,
    pub price_change_pct: f64,
    pub quote_volume: f64,
    pub last_price: f64,
}
