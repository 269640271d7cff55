//! Alert → Telegram HTML text.
//!
//! Volumes are shown in millions of the quote asset (`12.34M USDT`), prices
//! with six decimals, percentages signed with two.

use std::fmt::Write as _;
use std::time::Duration;

use vigil_core::{Alert, EscalationAlert, LargeTradeAlert, ReferenceSnapshot, VolumeAlert};

#[derive(Debug, Clone)]
pub struct AlertFormatter {
    /// Quote asset shown after volumes.
    quote: String,
}

impl AlertFormatter {
    pub fn new(quote: impl Into<String>) -> Self {
        Self { quote: quote.into() }
    }

    /// Render an alert, with optional 24h reference data appended.
    pub fn render(&self, alert: &Alert, reference: Option<&ReferenceSnapshot>) -> String {
        match alert {
            Alert::Volume(v) => self.volume(v),
            Alert::Escalation(e) => self.escalation(e, reference),
            Alert::LargeTrade(t) => self.large_trade(t, reference),
            Alert::FeedFatal { segment, attempts, reason } => format!(
                "⛔ <b>{}</b> feed stopped after {attempts} reconnect attempts\nLast error: {}",
                segment.display_name(),
                escape_html(reason)
            ),
        }
    }

    fn volume(&self, v: &VolumeAlert) -> String {
        format!(
            "📈 #{} volume surge\n\
             Volume Δ: +{} {q}\n\
             P: {:.6} {} ({:+.2}%)\n\
             24h volume: {} {q}\n\
             <i>{}</i>",
            v.symbol,
            millions(v.volume_change),
            v.price,
            arrow(v.price_change_pct),
            v.price_change_pct,
            millions(v.volume_24h),
            v.segment.display_name(),
            q = self.quote,
        )
    }

    fn escalation(&self, e: &EscalationAlert, reference: Option<&ReferenceSnapshot>) -> String {
        let mut text = format!(
            "🚨 #{} attack pattern: {} volume alerts in {}\n<i>{}</i>",
            e.symbol,
            e.count,
            human_window(e.window),
            e.segment.display_name()
        );
        if let Some(r) = reference {
            let _ = write!(
                text,
                "\n24h: P {:.6} {} ({:+.2}%), volume {} {}",
                r.last_price,
                arrow(r.price_change_pct),
                r.price_change_pct,
                millions(r.quote_volume),
                self.quote
            );
        }
        text
    }

    fn large_trade(&self, t: &LargeTradeAlert, reference: Option<&ReferenceSnapshot>) -> String {
        let mut text = format!("🎰 #{} buying 🔫\nTrade size: {} {}", t.symbol, millions(t.notional), self.quote);
        match reference {
            Some(r) => {
                let _ = write!(
                    text,
                    "\nP: {:.6} {} ({:+.2}%)\n24h volume: {} {}",
                    r.last_price,
                    arrow(r.price_change_pct),
                    r.price_change_pct,
                    millions(r.quote_volume),
                    self.quote
                );
            }
            None => {
                let _ = write!(text, "\nP: {:.6}", t.price);
            }
        }
        let _ = write!(text, "\n<i>{}</i>", t.segment.display_name());
        text
    }
}

/// `12345678.9` → `"12.35M"`.
pub fn millions(v: f64) -> String {
    format!("{:.2}M", v / 1_000_000.0)
}

fn arrow(pct: f64) -> &'static str {
    if pct > 0.0 { "⬆️" } else { "⬇️" }
}

fn human_window(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 { format!("{} min", secs / 60) } else { format!("{secs} s") }
}

/// Escape the characters Telegram's HTML parse mode treats specially.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use vigil_core::Segment;

    use super::*;

    fn fmt() -> AlertFormatter {
        AlertFormatter::new("USDT")
    }

    #[test]
    fn volume_alert_text() {
        let alert = Alert::Volume(VolumeAlert {
            segment: Segment::Futures,
            symbol: "BTCUSDT".into(),
            volume_change: 150_000.0,
            price: 37000.1,
            price_change_pct: 1.0,
            volume_24h: 10_150_000.0,
        });
        let text = fmt().render(&alert, None);
        assert!(text.contains("#BTCUSDT"));
        assert!(text.contains("+0.15M USDT"));
        assert!(text.contains("37000.100000 ⬆️ (+1.00%)"));
        assert!(text.contains("10.15M USDT"));
        assert!(text.ends_with("<i>Binance Futures</i>"));
    }

    #[test]
    fn escalation_with_and_without_reference() {
        let alert = Alert::Escalation(EscalationAlert {
            segment: Segment::Spot,
            symbol: "ETHUSDT".into(),
            count: 3,
            window: Duration::from_secs(600),
        });
        let bare = fmt().render(&alert, None);
        assert!(bare.contains("3 volume alerts in 10 min"));
        assert!(!bare.contains("24h:"));

        let r = ReferenceSnapshot {
            segment: Segment::Spot,
            symbol: "ETHUSDT".into(),
            price_change_pct: -2.5,
            quote_volume: 2_500_000_000.0,
            last_price: 2000.0,
        };
        let rich = fmt().render(&alert, Some(&r));
        assert!(rich.contains("24h: P 2000.000000 ⬇️ (-2.50%), volume 2500.00M USDT"));
    }

    #[test]
    fn fatal_reason_is_escaped() {
        let alert = Alert::FeedFatal { segment: Segment::Spot, attempts: 10, reason: "<eof> & more".into() };
        let text = fmt().render(&alert, None);
        assert!(text.contains("&lt;eof&gt; &amp; more"));
        assert!(text.contains("after 10 reconnect attempts"));
    }

    #[test]
    fn window_rendering() {
        assert_eq!(human_window(Duration::from_secs(600)), "10 min");
        assert_eq!(human_window(Duration::from_secs(90)), "90 s");
    }
}
