//! Alert delivery loop.
//!
//! The dispatcher drains the bounded alert channel in order, optionally enriches
//! escalation and large-trade alerts with 24h reference data, renders them,
//! and hands the text to the [`Notifier`]. Delivery is at-most-once: failures
//! are counted and logged, never retried.

use std::sync::Arc;

use tracing::{info, warn};
use vigil_core::{Alert, AlertReceiver, ReferenceSnapshot};

use crate::format::AlertFormatter;
use crate::{Notifier, ReferenceSource};

/// Outcome counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
    /// Alerts dropped because required reference data was unavailable.
    pub skipped: u64,
}

/// Result of handling a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed,
    Skipped,
}

pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    reference: Option<Arc<dyn ReferenceSource>>,
    formatter: AlertFormatter,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, formatter: AlertFormatter) -> Self {
        Self { notifier, reference: None, formatter }
    }

    /// Enable 24h enrichment of escalation and large-trade alerts.
    pub fn with_reference(mut self, reference: Arc<dyn ReferenceSource>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Deliver alerts until every sender has been dropped.
    pub async fn run(self, mut rx: AlertReceiver) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(alert) = rx.recv().await {
            match self.dispatch(&alert).await {
                Delivery::Delivered => stats.delivered += 1,
                Delivery::Failed => stats.failed += 1,
                Delivery::Skipped => stats.skipped += 1,
            }
        }
        info!(
            "[dispatch] alert channel closed — delivered={} failed={} skipped={}",
            stats.delivered, stats.failed, stats.skipped
        );
        stats
    }

    /// Handle one alert.
    pub async fn dispatch(&self, alert: &Alert) -> Delivery {
        let reference = match alert {
            Alert::Escalation(e) => self.lookup(alert, &e.symbol).await,
            Alert::LargeTrade(t) => {
                let r = self.lookup(alert, &t.symbol).await;
                if r.is_none() {
                    warn!("[dispatch] skipping large-trade alert for {}: no 24h data", t.symbol);
                    return Delivery::Skipped;
                }
                r
            }
            Alert::Volume(_) | Alert::FeedFatal { .. } => None,
        };

        let text = self.formatter.render(alert, reference.as_ref());
        if self.notifier.send(&text).await { Delivery::Delivered } else { Delivery::Failed }
    }

    async fn lookup(&self, alert: &Alert, symbol: &str) -> Option<ReferenceSnapshot> {
        let source = self.reference.as_ref()?;
        match source.fetch_24h(alert.segment(), symbol).await {
            Ok(snap) => Some(snap),
            Err(e) => {
                warn!("[dispatch] 24h lookup for {symbol} failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use vigil_core::error::VigilError;
    use vigil_core::{EscalationAlert, LargeTradeAlert, Segment, VolumeAlert, alert_channel};

    use super::*;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> bool {
            self.sent.lock().await.push(text.to_string());
            !self.fail
        }
    }

    struct FixedReference(Option<ReferenceSnapshot>);

    #[async_trait]
    impl ReferenceSource for FixedReference {
        async fn fetch_24h(&self, _segment: Segment, symbol: &str) -> Result<ReferenceSnapshot, VigilError> {
            self.0.clone().ok_or_else(|| VigilError::Http(format!("no data for {symbol}")))
        }
    }

    fn reference_snap() -> ReferenceSnapshot {
        ReferenceSnapshot {
            segment: Segment::Futures,
            symbol: "ETHUSDT".into(),
            price_change_pct: 4.2,
            quote_volume: 900_000_000.0,
            last_price: 2100.0,
        }
    }

    fn volume() -> Alert {
        Alert::Volume(VolumeAlert {
            segment: Segment::Futures,
            symbol: "ETHUSDT".into(),
            volume_change: 200_000.0,
            price: 2100.0,
            price_change_pct: 4.2,
            volume_24h: 900_000_000.0,
        })
    }

    fn escalation() -> Alert {
        Alert::Escalation(EscalationAlert {
            segment: Segment::Futures,
            symbol: "ETHUSDT".into(),
            count: 3,
            window: Duration::from_secs(600),
        })
    }

    fn large_trade() -> Alert {
        Alert::LargeTrade(LargeTradeAlert {
            segment: Segment::Futures,
            symbol: "ETHUSDT".into(),
            price: 2100.0,
            qty: 1000.0,
            notional: 2_100_000.0,
        })
    }

    #[tokio::test]
    async fn drains_channel_in_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone(), AlertFormatter::new("USDT"));
        let (tx, rx) = alert_channel(4);
        tx.send(volume()).await.unwrap();
        tx.send(escalation()).await.unwrap();
        drop(tx);

        let stats = dispatcher.run(rx).await;
        assert_eq!(stats, DispatchStats { delivered: 2, failed: 0, skipped: 0 });

        let sent = notifier.sent.lock().await;
        assert!(sent[0].contains("volume surge"));
        assert!(sent[1].contains("attack pattern"));
    }

    #[tokio::test]
    async fn escalation_is_enriched_when_data_available() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone(), AlertFormatter::new("USDT"))
            .with_reference(Arc::new(FixedReference(Some(reference_snap()))));

        assert_eq!(dispatcher.dispatch(&escalation()).await, Delivery::Delivered);
        assert!(notifier.sent.lock().await[0].contains("24h: P 2100.000000"));
    }

    #[tokio::test]
    async fn escalation_degrades_without_data() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone(), AlertFormatter::new("USDT"))
            .with_reference(Arc::new(FixedReference(None)));

        assert_eq!(dispatcher.dispatch(&escalation()).await, Delivery::Delivered);
        assert!(!notifier.sent.lock().await[0].contains("24h:"));
    }

    #[tokio::test]
    async fn large_trade_needs_reference_data() {
        let notifier = Arc::new(RecordingNotifier::default());
        let without = AlertDispatcher::new(notifier.clone(), AlertFormatter::new("USDT"))
            .with_reference(Arc::new(FixedReference(None)));
        assert_eq!(without.dispatch(&large_trade()).await, Delivery::Skipped);
        assert!(notifier.sent.lock().await.is_empty());

        let with = AlertDispatcher::new(notifier.clone(), AlertFormatter::new("USDT"))
            .with_reference(Arc::new(FixedReference(Some(reference_snap()))));
        assert_eq!(with.dispatch(&large_trade()).await, Delivery::Delivered);
        assert!(notifier.sent.lock().await[0].contains("Trade size: 2.10M USDT"));
    }

    #[tokio::test]
    async fn delivery_failure_is_counted_not_retried() {
        let notifier = Arc::new(RecordingNotifier { fail: true, ..Default::default() });
        let dispatcher = AlertDispatcher::new(notifier.clone(), AlertFormatter::new("USDT"));
        let (tx, rx) = alert_channel(4);
        tx.send(volume()).await.unwrap();
        drop(tx);

        let stats = dispatcher.run(rx).await;
        assert_eq!(stats.failed, 1);
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }
}
