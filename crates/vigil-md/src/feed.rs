//! Feed connection manager, one resilient subscription per segment.
//!
//! ```text
//! Disconnected ─► Connecting ─► Subscribed ─(ack)─► Streaming
//!        ▲                           │                  │
//!        │                           └──── loss ────────┤
//!        │                                              ▼
//!        └──────────── retry ◄──── Backoff ─(exhausted)─► FeedFatal, stop
//! ```
//!
//! The retry loop is explicit and bounded; the attempt counter is local state
//! reset each time the connection reaches `Streaming`. Frames of one
//! connection are handled strictly in arrival order on the manager's task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use vigil_core::config::AppConfig;
use vigil_core::error::VigilError;
use vigil_core::ws::{Backoff, Connector};
use vigil_core::{Alert, AlertSender, ConnectionState, FeedEntry, Segment};

use crate::binance::json_parser::{AckStatus, Frame, classify_ack, decode_frame};
use crate::binance::{self, SUBSCRIBE_ID};
use crate::detector::{AnomalyDetector, LargeTradeDetector};

// ---------------------------------------------------------------------------
// Settings & stats
// ---------------------------------------------------------------------------

/// Per-segment connection settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub subscribe_msg: String,
    pub quote_suffix: String,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub read_timeout: Duration,
    pub ack_timeout: Duration,
}

impl FeedSettings {
    pub fn from_config(cfg: &AppConfig, segment: Segment) -> Self {
        let streams = binance::streams(cfg.large_trade.is_some());
        Self {
            url: cfg.endpoints.ws_url(segment).to_string(),
            subscribe_msg: binance::build_subscribe(&streams),
            quote_suffix: cfg.quote_suffix.clone(),
            max_attempts: cfg.reconnect.max_attempts,
            base_delay: cfg.reconnect.base_delay(),
            read_timeout: cfg.reconnect.read_timeout(),
            ack_timeout: cfg.reconnect.ack_timeout(),
        }
    }
}

/// Counters read by the heartbeat reporter.
#[derive(Debug, Default)]
pub struct FeedStats {
    messages: AtomicU64,
    since_report: AtomicU64,
    dropped_alerts: AtomicU64,
    state: AtomicU8,
}

impl FeedStats {
    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.since_report.fetch_add(1, Ordering::Relaxed);
    }

    /// Total data frames since start.
    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Frames since the previous call; resets the counter.
    pub fn take_since_report(&self) -> u64 {
        self.since_report.swap(0, Ordering::Relaxed)
    }

    /// Record an alert lost to a full alert queue; returns the new total.
    pub fn record_dropped_alert(&self) -> u64 {
        self.dropped_alerts.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Alerts dropped since start because the queue was full.
    pub fn dropped_alerts(&self) -> u64 {
        self.dropped_alerts.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }
}

/// Why [`FeedManager::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedExit {
    Shutdown,
    /// Reconnect attempts exhausted; a `FeedFatal` alert was emitted.
    Exhausted,
}

enum SessionEnd {
    Shutdown,
    Lost(VigilError),
}

// ---------------------------------------------------------------------------
// FeedManager
// ---------------------------------------------------------------------------

pub struct FeedManager<C: Connector> {
    segment: Segment,
    settings: FeedSettings,
    connector: C,
    detector: Arc<AnomalyDetector>,
    large_trades: Option<LargeTradeDetector>,
    alerts: AlertSender,
    stats: Arc<FeedStats>,
}

impl<C: Connector> FeedManager<C> {
    pub fn new(
        segment: Segment,
        settings: FeedSettings,
        connector: C,
        detector: Arc<AnomalyDetector>,
        alerts: AlertSender,
    ) -> Self {
        Self {
            segment,
            settings,
            connector,
            detector,
            large_trades: None,
            alerts,
            stats: Arc::new(FeedStats::default()),
        }
    }

    /// Enable large taker-buy detection on aggregate trade entries.
    pub fn with_large_trades(mut self, detector: LargeTradeDetector) -> Self {
        self.large_trades = Some(detector);
        self
    }

    pub fn stats(&self) -> Arc<FeedStats> {
        self.stats.clone()
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    /// Run until shutdown is signalled or reconnects are exhausted.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> FeedExit {
        let seg = self.segment;
        let mut backoff = Backoff::new(self.settings.base_delay, self.settings.max_attempts);

        loop {
            if *shutdown.borrow() {
                info!("[{seg}] shutdown requested");
                self.stats.set_state(ConnectionState::Disconnected);
                return FeedExit::Shutdown;
            }

            let reason = match self.session(&mut backoff, &mut shutdown).await {
                SessionEnd::Shutdown => {
                    self.stats.set_state(ConnectionState::Disconnected);
                    return FeedExit::Shutdown;
                }
                SessionEnd::Lost(e) => e,
            };

            self.stats.set_state(ConnectionState::Backoff);
            match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "[{seg}] connection lost: {reason}; retry {}/{} in {delay:?}",
                        backoff.attempt(),
                        self.settings.max_attempts
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {
                            self.stats.set_state(ConnectionState::Disconnected);
                            return FeedExit::Shutdown;
                        }
                    }
                }
                None => {
                    error!("[{seg}] giving up after {} reconnect attempts: {reason}", backoff.attempt());
                    let fatal = Alert::FeedFatal { segment: seg, attempts: backoff.attempt(), reason: reason.to_string() };
                    // Waits for room: this alert must not be dropped.
                    if self.alerts.send(fatal).await.is_err() {
                        warn!("[{seg}] alert channel closed, fatal alert not delivered");
                    }
                    self.stats.set_state(ConnectionState::Disconnected);
                    return FeedExit::Exhausted;
                }
            }
        }
    }

    /// One connection lifetime: connect, subscribe, await ack, stream.
    async fn session(&self, backoff: &mut Backoff, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        let seg = self.segment;
        self.stats.set_state(ConnectionState::Connecting);
        info!("[{seg}] connecting to {}", self.settings.url);

        let mut conn = match self.connector.connect(&self.settings.url).await {
            Ok(c) => c,
            Err(e) => return SessionEnd::Lost(e),
        };

        debug!("[{seg}] subscribing: {}", self.settings.subscribe_msg);
        if let Err(e) = conn.send(Message::Text(self.settings.subscribe_msg.clone().into())).await {
            return SessionEnd::Lost(e.into());
        }
        self.stats.set_state(ConnectionState::Subscribed);

        let ack = tokio::select! {
            _ = shutdown.changed() => {
                let _ = conn.close().await;
                return SessionEnd::Shutdown;
            }
            r = tokio::time::timeout(self.settings.ack_timeout, Self::await_ack(&mut conn)) => r,
        };
        match ack {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return SessionEnd::Lost(e),
            Err(_) => return SessionEnd::Lost(VigilError::Timeout("subscription ack".into())),
        }

        info!("[{seg}] subscription acknowledged, streaming");
        self.stats.set_state(ConnectionState::Streaming);
        backoff.reset();

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("[{seg}] shutdown signal received");
                    let _ = conn.close().await;
                    return SessionEnd::Shutdown;
                }

                next = tokio::time::timeout(self.settings.read_timeout, conn.next()) => {
                    match next {
                        Err(_) => {
                            return SessionEnd::Lost(VigilError::Timeout(format!(
                                "no frame for {:?}",
                                self.settings.read_timeout
                            )));
                        }
                        Ok(Some(Ok(Message::Text(text)))) => {
                            self.handle_text(&text, Instant::now());
                        }
                        Ok(Some(Ok(Message::Ping(data)))) => {
                            if let Err(e) = conn.send(Message::Pong(data)).await {
                                return SessionEnd::Lost(e.into());
                            }
                        }
                        Ok(Some(Ok(Message::Close(frame)))) => {
                            return SessionEnd::Lost(VigilError::WebSocket(format!("closed by server: {frame:?}")));
                        }
                        Ok(Some(Err(e))) => return SessionEnd::Lost(e.into()),
                        Ok(None) => return SessionEnd::Lost(VigilError::WebSocket("stream ended".into())),
                        Ok(Some(Ok(_))) => {} // Binary, Pong, Frame
                    }
                }
            }
        }
    }

    /// Read frames until the subscription ack (or a rejection) arrives.
    async fn await_ack(conn: &mut C::Conn) -> Result<(), VigilError> {
        while let Some(msg) = conn.next().await {
            match msg? {
                Message::Text(text) => match classify_ack(&text, SUBSCRIBE_ID) {
                    AckStatus::Ack => return Ok(()),
                    AckStatus::Rejected(err) => {
                        return Err(VigilError::WebSocket(format!("subscription rejected: {err}")));
                    }
                    AckStatus::Other => debug!("discarding frame received before subscription ack"),
                },
                Message::Ping(data) => conn.send(Message::Pong(data)).await?,
                Message::Close(frame) => {
                    return Err(VigilError::WebSocket(format!("closed before ack: {frame:?}")));
                }
                _ => {}
            }
        }
        Err(VigilError::WebSocket("stream ended before ack".into()))
    }

    /// Decode one text frame and run every accepted entry through detection.
    ///
    /// Returns the number of alerts produced, including any dropped because
    /// the alert queue was full. Malformed frames are dropped.
    pub fn handle_text(&self, text: &str, now: Instant) -> usize {
        let seg = self.segment;
        self.stats.record_message();

        let entries = match decode_frame(text, &self.settings.quote_suffix) {
            Ok(Frame::Entries(entries)) => entries,
            Ok(Frame::Control(v)) => {
                debug!("[{seg}] control frame: {v}");
                return 0;
            }
            Err(e) => {
                warn!("[{seg}] dropping malformed frame: {e}");
                return 0;
            }
        };

        let mut emitted = 0;
        for entry in &entries {
            match entry {
                FeedEntry::Ticker(snap) => {
                    for alert in self.detector.evaluate(seg, snap, now) {
                        self.emit(alert);
                        emitted += 1;
                    }
                }
                FeedEntry::Trade(trade) => {
                    if let Some(alert) = self.large_trades.as_ref().and_then(|d| d.evaluate(seg, trade)) {
                        self.emit(alert);
                        emitted += 1;
                    }
                }
            }
        }
        emitted
    }

    fn emit(&self, alert: Alert) {
        if let Alert::Volume(v) = &alert {
            info!("[{}] volume alert {} +{:.0} ({:+.2}%)", self.segment, v.symbol, v.volume_change, v.price_change_pct);
        }
        match self.alerts.try_send(alert) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let total = self.stats.record_dropped_alert();
                if total == 1 || total % 1000 == 0 {
                    warn!("[{}] alert queue full, {total} alert(s) dropped so far", self.segment);
                }
            }
            Err(TrySendError::Closed(_)) => {
                warn!("[{}] alert channel closed, dropping alert", self.segment);
            }
        }
    }
}
