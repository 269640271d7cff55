//! Process lifecycle: feed managers, alert dispatcher, heartbeat.
//!
//! ```text
//!  FeedManager(futures) ─┐
//!  FeedManager(spot)    ─┼─► alert channel ─► AlertDispatcher ─► Notifier
//!                        │
//!  Heartbeat ────────────┴───────────────────────────────────────► Notifier
//! ```
//!
//! Shutdown order: signal every task, wait for the managers and heartbeat,
//! let the dispatcher drain what the managers already queued, then send a
//! final notice.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vigil_core::{Segment, alert_channel};
use vigil_core::config::AppConfig;
use vigil_core::store::SymbolStateStore;
use vigil_core::ws::Connector;
use vigil_md::{AnomalyDetector, FeedExit, FeedManager, FeedSettings, LargeTradeDetector};
use vigil_rest::{AlertDispatcher, AlertFormatter, DispatchStats, Notifier, ReferenceSource};

use crate::heartbeat::{Heartbeat, SegmentMonitor};

/// Final text sent once every task has stopped.
pub const SHUTDOWN_NOTICE: &str = "🛑 Volume alerts stopped";

/// What each task reported when the process wound down.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub feeds: Vec<(Segment, FeedExit)>,
    pub heartbeats: u64,
    pub dispatch: DispatchStats,
}

pub struct Supervisor<C: Connector + Clone> {
    config: AppConfig,
    connector: C,
    store: Arc<SymbolStateStore>,
    notifier: Arc<dyn Notifier>,
    reference: Option<Arc<dyn ReferenceSource>>,
}

impl<C: Connector + Clone> Supervisor<C> {
    pub fn new(config: AppConfig, connector: C, notifier: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(SymbolStateStore::new(config.detector.history_capacity));
        Self { config, connector, store, notifier, reference: None }
    }

    pub fn with_reference(mut self, reference: Arc<dyn ReferenceSource>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Run every task until `signal` resolves, then shut down in order.
    pub async fn run(self, signal: impl Future<Output = ()>) -> RunSummary {
        let (alert_tx, alert_rx) = alert_channel(self.config.alert_queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let detector = Arc::new(AnomalyDetector::new(self.store.clone(), &self.config.detector));

        // 1. Feed managers, one per segment
        let mut monitors = Vec::with_capacity(self.config.segments.len());
        let mut feeds: Vec<(Segment, JoinHandle<FeedExit>)> = Vec::with_capacity(self.config.segments.len());
        for &segment in &self.config.segments {
            let settings = FeedSettings::from_config(&self.config, segment);
            let mut manager =
                FeedManager::new(segment, settings, self.connector.clone(), detector.clone(), alert_tx.clone());
            if let Some(cfg) = &self.config.large_trade {
                manager = manager.with_large_trades(LargeTradeDetector::new(cfg));
            }
            monitors.push(SegmentMonitor { segment, stats: manager.stats() });
            feeds.push((segment, tokio::spawn(manager.run(shutdown_rx.clone()))));
            info!("[{segment}] feed manager started");
        }
        // Managers own the remaining senders; the channel closes when they exit.
        drop(alert_tx);

        // 2. Alert dispatcher
        let mut dispatcher = AlertDispatcher::new(self.notifier.clone(), AlertFormatter::new(&self.config.quote_suffix));
        if let Some(reference) = &self.reference {
            dispatcher = dispatcher.with_reference(reference.clone());
        }
        let dispatch_task = tokio::spawn(dispatcher.run(alert_rx));

        // 3. Heartbeat
        let heartbeat =
            Heartbeat::new(self.notifier.clone(), monitors, self.store.clone(), self.config.heartbeat_interval());
        let heartbeat_task = tokio::spawn(heartbeat.run(shutdown_rx));

        info!("all {} feed(s) started", feeds.len());

        // 4. Wait for shutdown signal
        signal.await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);

        // 5. Wind down
        let mut summary = RunSummary::default();
        for (segment, handle) in feeds {
            match handle.await {
                Ok(exit) => {
                    info!("[{segment}] feed manager stopped ({exit:?})");
                    summary.feeds.push((segment, exit));
                }
                Err(e) => error!("[{segment}] feed manager task failed: {e}"),
            }
        }
        match heartbeat_task.await {
            Ok(n) => summary.heartbeats = n,
            Err(e) => error!("heartbeat task failed: {e}"),
        }
        match dispatch_task.await {
            Ok(stats) => summary.dispatch = stats,
            Err(e) => error!("dispatcher task failed: {e}"),
        }

        if !self.notifier.send(SHUTDOWN_NOTICE).await {
            warn!("shutdown notice was not delivered");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use vigil_core::error::VigilError;
    use vigil_core::ws::WsStream;

    use super::*;

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<String>>);

    impl RecordingNotifier {
        fn sent(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> bool {
            self.0.lock().unwrap().push(text.to_string());
            true
        }
    }

    /// Every connection attempt is refused.
    #[derive(Clone)]
    struct RefusingConnector;

    #[async_trait]
    impl Connector for RefusingConnector {
        type Conn = WsStream;

        async fn connect(&self, _url: &str) -> Result<WsStream, VigilError> {
            Err(VigilError::WebSocket("connection refused".into()))
        }
    }

    fn fast_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.reconnect.max_attempts = 2;
        cfg.reconnect.base_delay_secs = 0.0;
        cfg
    }

    #[tokio::test]
    async fn exhausted_feeds_do_not_stop_the_process() {
        let notifier = Arc::new(RecordingNotifier::default());
        let supervisor = Supervisor::new(fast_config(), RefusingConnector, notifier.clone());

        let summary = supervisor.run(tokio::time::sleep(Duration::from_millis(200))).await;

        assert_eq!(summary.feeds.len(), 2);
        assert!(summary.feeds.iter().all(|(_, exit)| *exit == FeedExit::Exhausted));
        assert_eq!(summary.dispatch.delivered, 2);
        assert_eq!(summary.heartbeats, 1);

        let sent = notifier.sent();
        assert_eq!(sent.iter().filter(|t| t.contains("feed stopped after 2 reconnect attempts")).count(), 2);
        assert!(sent.iter().any(|t| t.contains("Volume alerts running")));
        assert_eq!(sent.last().map(String::as_str), Some(SHUTDOWN_NOTICE));
    }

    #[tokio::test]
    async fn shutdown_interrupts_backoff() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut cfg = fast_config();
        cfg.segments = vec![Segment::Spot];
        cfg.reconnect.base_delay_secs = 30.0;
        let supervisor = Supervisor::new(cfg, RefusingConnector, notifier.clone());

        let summary = tokio::time::timeout(
            Duration::from_secs(5),
            supervisor.run(tokio::time::sleep(Duration::from_millis(100))),
        )
        .await
        .expect("shutdown should not wait out the backoff");

        assert_eq!(summary.feeds, vec![(Segment::Spot, FeedExit::Shutdown)]);
        assert_eq!(summary.dispatch.delivered, 0);
        assert!(!notifier.sent().iter().any(|t| t.contains("feed stopped")));
    }
}
