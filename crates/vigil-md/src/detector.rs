//! Volume-surge and escalation detection.
//!
//! [`AnomalyDetector::evaluate`] is the whole decision for one ticker update:
//!
//! ```text
//! record volume ─► < 2 readings? ─► stop
//!               ─► delta < min_volume_change? ─► stop
//!               ─► price change < min_price_change? ─► stop
//!               ─► Volume alert
//!               ─► append to escalation window (symbol-wide)
//!                    └► window ≥ threshold? ─► Escalation alert, clear window
//! ```
//!
//! Detection is synchronous and infallible. It mutates the shared
//! [`SymbolStateStore`] and returns alert events; delivery happens elsewhere.

use std::sync::Arc;
use std::time::{Duration, Instant};

use vigil_core::config::{DetectorConfig, LargeTradeConfig};
use vigil_core::store::SymbolStateStore;
use vigil_core::{Alert, EscalationAlert, LargeTradeAlert, Segment, SymbolKey, TickerSnapshot, TradePrint, VolumeAlert};

pub struct AnomalyDetector {
    store: Arc<SymbolStateStore>,
    min_volume_change: f64,
    min_price_change: f64,
    escalation_window: Duration,
    escalation_threshold: usize,
}

impl AnomalyDetector {
    pub fn new(store: Arc<SymbolStateStore>, cfg: &DetectorConfig) -> Self {
        Self {
            store,
            min_volume_change: cfg.min_volume_change,
            min_price_change: cfg.min_price_change,
            escalation_window: cfg.escalation_window(),
            escalation_threshold: cfg.escalation_threshold.max(1),
        }
    }

    pub fn store(&self) -> &Arc<SymbolStateStore> {
        &self.store
    }

    /// Evaluate one ticker update for `segment` at time `now`.
    ///
    /// Returns zero, one (volume) or two (volume + escalation) alerts.
    pub fn evaluate(&self, segment: Segment, snap: &TickerSnapshot, now: Instant) -> Vec<Alert> {
        let key = SymbolKey::new(segment, snap.symbol.as_str());
        let delta = self.store.record_volume(&key, snap.quote_volume_24h);

        let Some(volume_change) = delta.change() else {
            return Vec::new();
        };
        if volume_change < self.min_volume_change || snap.price_change_pct < self.min_price_change {
            return Vec::new();
        }

        let mut alerts = Vec::with_capacity(2);
        alerts.push(Alert::Volume(VolumeAlert {
            segment,
            symbol: snap.symbol.clone(),
            volume_change,
            price: snap.last_price,
            price_change_pct: snap.price_change_pct,
            volume_24h: snap.quote_volume_24h,
        }));

        if let Some(count) =
            self.store.escalate(&snap.symbol, now, self.escalation_window, self.escalation_threshold)
        {
            alerts.push(Alert::Escalation(EscalationAlert {
                segment,
                symbol: snap.symbol.clone(),
                count,
                window: self.escalation_window,
            }));
        }

        alerts
    }
}

/// Flags single taker-buy trades above a notional threshold.
#[derive(Debug, Clone)]
pub struct LargeTradeDetector {
    min_notional: f64,
}

impl LargeTradeDetector {
    pub fn new(cfg: &LargeTradeConfig) -> Self {
        Self { min_notional: cfg.min_notional }
    }

    pub fn evaluate(&self, segment: Segment, trade: &TradePrint) -> Option<Alert> {
        let notional = trade.notional();
        if trade.is_buyer_maker || notional <= self.min_notional {
            return None;
        }
        Some(Alert::LargeTrade(LargeTradeAlert {
            segment,
            symbol: trade.symbol.clone(),
            price: trade.price,
            qty: trade.qty,
            notional,
        }))
    }
}
