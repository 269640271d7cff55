//! Configuration parsing.
//!
//! Tunables come from an optional JSON file; every field has a default so an
//! empty object (or no file at all) yields a working setup. Secrets never live
//! in the file: they are read from the environment (optionally via `.env`).
//!
//! # Example config
//!
//! ```json
//! {
//!   "segments": ["futures", "spot"],
//!   "quote_suffix": "USDT",
//!   "detector": { "min_volume_change": 100000, "min_price_change": 0.5 },
//!   "reconnect": { "max_attempts": 10, "base_delay_secs": 5 },
//!   "heartbeat_interval_secs": 3600,
//!   "alert_queue_capacity": 1024,
//!   "large_trade": { "min_notional": 1000000 }
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::VigilError;
use crate::types::Segment;

/// Environment variable holding the Telegram bot token.
pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";
/// Environment variable holding the Telegram destination chat id.
pub const CHANNEL_ENV: &str = "TELEGRAM_CHANNEL";

/// Upper bound for `reconnect.base_delay_secs`.
pub const MAX_BASE_DELAY_SECS: f64 = 3600.0;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Segments to subscribe, one feed manager each.
    pub segments: Vec<Segment>,

    /// Only symbols quoted in this asset are tracked.
    pub quote_suffix: String,

    pub detector: DetectorConfig,

    pub reconnect: ReconnectConfig,

    /// Interval between statistics messages.
    pub heartbeat_interval_secs: u64,

    /// Reference-data REST rate limit.
    pub rate_limit: RateLimitConfig,

    /// Alerts buffered between the feeds and the dispatcher. Alerts arriving
    /// while the queue is full are dropped and counted.
    pub alert_queue_capacity: usize,

    /// Large taker-buy alerts. Disabled when absent.
    pub large_trade: Option<LargeTradeConfig>,

    /// Endpoint overrides (tests, testnets).
    pub endpoints: EndpointConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            segments: Segment::ALL.to_vec(),
            quote_suffix: "USDT".into(),
            detector: DetectorConfig::default(),
            reconnect: ReconnectConfig::default(),
            heartbeat_interval_secs: 3600,
            rate_limit: RateLimitConfig::default(),
            alert_queue_capacity: 1024,
            large_trade: None,
            endpoints: EndpointConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Reject values that would make the detector or reconnect loop misbehave.
    pub fn validate(&self) -> Result<(), VigilError> {
        if self.segments.is_empty() {
            return Err(VigilError::Config("at least one segment is required".into()));
        }
        if self.quote_suffix.is_empty() {
            return Err(VigilError::Config("quote_suffix must not be empty".into()));
        }
        if self.detector.history_capacity < 2 {
            return Err(VigilError::Config("detector.history_capacity must be >= 2".into()));
        }
        if self.detector.escalation_threshold == 0 {
            return Err(VigilError::Config("detector.escalation_threshold must be >= 1".into()));
        }
        if self.rate_limit.max_calls == 0 {
            return Err(VigilError::Config("rate_limit.max_calls must be >= 1".into()));
        }
        if self.alert_queue_capacity == 0 {
            return Err(VigilError::Config("alert_queue_capacity must be >= 1".into()));
        }
        let base = self.reconnect.base_delay_secs;
        if !(base.is_finite() && (0.0..=MAX_BASE_DELAY_SECS).contains(&base)) {
            return Err(VigilError::Config(format!(
                "reconnect.base_delay_secs must be between 0 and {MAX_BASE_DELAY_SECS}, got {base}"
            )));
        }
        Ok(())
    }
}

/// Anomaly detector thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Volume readings kept per `(segment, symbol)`.
    pub history_capacity: usize,
    /// Minimum 24h quote-volume increase between two consecutive readings.
    pub min_volume_change: f64,
    /// Minimum 24h price change, in percent.
    pub min_price_change: f64,
    /// Trailing window for escalation counting.
    pub escalation_window_secs: u64,
    /// Volume alerts inside the window that trigger an escalation.
    pub escalation_threshold: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 5,
            min_volume_change: 100_000.0,
            min_price_change: 0.5,
            escalation_window_secs: 600,
            escalation_threshold: 3,
        }
    }
}

impl DetectorConfig {
    pub fn escalation_window(&self) -> Duration {
        Duration::from_secs(self.escalation_window_secs)
    }
}

/// Reconnect / liveness settings for each feed manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reconnect attempts before the segment is given up.
    pub max_attempts: u32,
    /// Base backoff delay; doubled per attempt, capped at 16x.
    pub base_delay_secs: f64,
    /// Silence on an open connection longer than this counts as a disconnect.
    pub read_timeout_secs: u64,
    /// Maximum wait for the subscription acknowledgment.
    pub ack_timeout_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self { max_attempts: 10, base_delay_secs: 5.0, read_timeout_secs: 60, ack_timeout_secs: 10 }
    }
}

impl ReconnectConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_delay_secs.clamp(0.0, MAX_BASE_DELAY_SECS)).unwrap_or_default()
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(1))
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs.max(1))
    }
}

/// Sliding-window limit for reference-data calls, per endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_calls: usize,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_calls: 10, window_ms: 1000 }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Large taker-buy trade detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LargeTradeConfig {
    /// Trades must be worth strictly more than this, in the quote asset.
    pub min_notional: f64,
}

impl Default for LargeTradeConfig {
    fn default() -> Self {
        Self { min_notional: 1_000_000.0 }
    }
}

/// Exchange and notification endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub futures_ws: String,
    pub spot_ws: String,
    pub futures_rest: String,
    pub spot_rest: String,
    pub telegram_api: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            futures_ws: "wss://fstream.binance.com/ws".into(),
            spot_ws: "wss://stream.binance.com:9443/ws".into(),
            futures_rest: "https://fapi.binance.com/fapi/v1/ticker/24hr".into(),
            spot_rest: "https://api.binance.com/api/v3/ticker/24hr".into(),
            telegram_api: "https://api.telegram.org".into(),
        }
    }
}

impl EndpointConfig {
    pub fn ws_url(&self, segment: Segment) -> &str {
        match segment {
            Segment::Futures => &self.futures_ws,
            Segment::Spot => &self.spot_ws,
        }
    }

    pub fn rest_url(&self, segment: Segment) -> &str {
        match segment {
            Segment::Futures => &self.futures_rest,
            Segment::Spot => &self.spot_rest,
        }
    }
}

/// Notification-channel credentials.
#[derive(Clone)]
pub struct Secrets {
    pub telegram_token: String,
    pub telegram_channel: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("telegram_token", &"<redacted>")
            .field("telegram_channel", &self.telegram_channel)
            .finish()
    }
}

impl Secrets {
    /// Read secrets from the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, VigilError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build secrets from an arbitrary key lookup. Missing or blank values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, VigilError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| VigilError::Config(format!("environment variable {key} is not set")))
        };
        Ok(Self { telegram_token: get(TOKEN_ENV)?, telegram_channel: get(CHANNEL_ENV)? })
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
