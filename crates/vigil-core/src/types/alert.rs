//! Alert events produced by the detectors and the feed managers.
//!
//! Detection never performs I/O. It returns [`Alert`] values which are sent
//! over an [`AlertSender`] channel to the dispatcher, which formats and
//! delivers them. The channel is bounded; producers never wait on it and
//! drop alerts that arrive while it is full.

use std::time::Duration;

use super::enums::Segment;

/// Qualifying 24h-volume jump with price confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeAlert {
    pub segment: Segment,
    pub symbol: String,
    /// Difference between the two most recent 24h quote-volume readings.
    pub volume_change: f64,
    pub price: f64,
    pub price_change_pct: f64,
    pub volume_24h: f64,
}

/// Repeated volume alerts for one symbol inside the escalation window.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationAlert {
    /// Segment whose volume alert completed the burst.
    pub segment: Segment,
    pub symbol: String,
    /// Number of volume alerts in the window when it fired.
    pub count: usize,
    pub window: Duration,
}

/// A single large taker-buy trade.
#[derive(Debug, Clone, PartialEq)]
pub struct LargeTradeAlert {
    pub segment: Segment,
    pub symbol: String,
    pub price: f64,
    pub qty: f64,
    pub notional: f64,
}

/// A typed event for the alert dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Volume(VolumeAlert),
    Escalation(EscalationAlert),
    LargeTrade(LargeTradeAlert),

    /// A feed manager exhausted its reconnect attempts and stopped.
    FeedFatal {
        segment: Segment,
        /// Reconnect attempts made before giving up.
        attempts: u32,
        /// Last connection error.
        reason: String,
    },
}

impl Alert {
    /// Segment the alert originated from.
    pub fn segment(&self) -> Segment {
        match self {
            Self::Volume(a) => a.segment,
            Self::Escalation(a) => a.segment,
            Self::LargeTrade(a) => a.segment,
            Self::FeedFatal { segment, .. } => *segment,
        }
    }
}

/// Sender half of the bounded alert channel.
pub type AlertSender = tokio::sync::mpsc::Sender<Alert>;

/// Receiver half of the alert channel, drained by the dispatcher.
pub type AlertReceiver = tokio::sync::mpsc::Receiver<Alert>;

/// Create the alert channel. `capacity` must be at least 1.
pub fn alert_channel(capacity: usize) -> (AlertSender, AlertReceiver) {
    tokio::sync::mpsc::channel(capacity.max(1))
}
