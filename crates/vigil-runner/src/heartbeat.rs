//! Periodic statistics report.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;
use vigil_core::Segment;
use vigil_core::store::SymbolStateStore;
use vigil_md::FeedStats;
use vigil_rest::Notifier;

/// Counters of one running feed manager.
#[derive(Clone)]
pub struct SegmentMonitor {
    pub segment: Segment,
    pub stats: Arc<FeedStats>,
}

pub struct Heartbeat {
    notifier: Arc<dyn Notifier>,
    monitors: Vec<SegmentMonitor>,
    store: Arc<SymbolStateStore>,
    interval: Duration,
    started: Instant,
}

impl Heartbeat {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        monitors: Vec<SegmentMonitor>,
        store: Arc<SymbolStateStore>,
        interval: Duration,
    ) -> Self {
        Self { notifier, monitors, store, interval, started: Instant::now() }
    }

    /// Build the report text. Resets each segment's since-last counter.
    pub fn report(&self) -> String {
        let mut text = format!("💓 <b>Volume alerts running</b> (uptime {})", uptime(self.started.elapsed()));
        for m in &self.monitors {
            let _ = write!(
                text,
                "\n{}: {} msgs (+{} since last), {} symbols, {}",
                m.segment.display_name(),
                m.stats.messages(),
                m.stats.take_since_report(),
                self.store.tracked_symbols(m.segment),
                m.stats.state()
            );
            let dropped = m.stats.dropped_alerts();
            if dropped > 0 {
                let _ = write!(text, ", {dropped} alerts dropped (queue full)");
            }
        }
        text
    }

    /// Report on startup, then every interval, until shutdown. Returns the
    /// number of reports sent.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sent = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let text = self.report();
                    info!("[heartbeat] {}", text.replace('\n', " | "));
                    if self.notifier.send(&text).await {
                        sent += 1;
                    }
                }
                r = shutdown.changed() => {
                    if r.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        sent
    }
}

fn uptime(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m) = (secs / 3600, (secs % 3600) / 60);
    if h > 0 { format!("{h}h {m}m") } else { format!("{m}m") }
}
