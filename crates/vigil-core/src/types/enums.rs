//! Enumerations used throughout the alerting system.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Market segments
// ---------------------------------------------------------------------------

/// Market segment: one venue / product type with its own stream subscription.
///
/// Segments never share volume history. They do share the escalation window,
/// which is keyed by symbol only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// USDT-margined perpetual futures.
    Futures,
    /// Spot market.
    Spot,
}

impl Segment {
    /// All known segments, in the order they are started by default.
    pub const ALL: [Segment; 2] = [Segment::Futures, Segment::Spot];

    /// Short lowercase label used in logs (`"futures"`, `"spot"`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Futures => "futures",
            Self::Spot => "spot",
        }
    }

    /// Human-readable venue name used in alert text.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Futures => "Binance Futures",
            Self::Spot => "Binance Spot",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of one feed connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    /// Subscription request sent, acknowledgment not yet received.
    Subscribed = 2,
    Streaming = 3,
    Backoff = 4,
}

impl ConnectionState {
    /// Decode from the `u8` discriminant (used for lock-free state sharing).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Connecting,
            2 => Self::Subscribed,
            3 => Self::Streaming,
            4 => Self::Backoff,
            _ => Self::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Subscribed => "subscribed",
            Self::Streaming => "streaming",
            Self::Backoff => "backoff",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_state_u8_round_trip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Subscribed,
            ConnectionState::Streaming,
            ConnectionState::Backoff,
        ] {
            assert_eq!(ConnectionState::from_u8(state as u8), state);
        }
    }
}
