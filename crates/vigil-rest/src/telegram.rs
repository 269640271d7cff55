//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use vigil_core::config::Secrets;
use vigil_core::error::VigilError;

use crate::Notifier;

/// Subset of the Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends HTML-formatted messages to one chat via `sendMessage`.
pub struct TelegramNotifier {
    http: reqwest::Client,
    /// `https://api.telegram.org/bot<token>/sendMessage`; never logged.
    send_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, secrets: &Secrets) -> Result<Self, VigilError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VigilError::Http(format!("client build failed: {e}")))?;
        Ok(Self {
            http,
            send_url: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), secrets.telegram_token),
            chat_id: secrets.telegram_channel.clone(),
        })
    }

    /// Send and report the failure cause instead of a bare flag.
    pub async fn try_send(&self, text: &str) -> Result<(), VigilError> {
        let resp = self
            .http
            .post(&self.send_url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text), ("parse_mode", "HTML")])
            .send()
            .await
            // The URL embeds the bot token.
            .map_err(|e| VigilError::Notify(e.without_url().to_string()))?;

        let status = resp.status();
        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| VigilError::Notify(format!("HTTP {status}, unreadable body: {}", e.without_url())))?;

        if status.is_success() && body.ok {
            Ok(())
        } else {
            Err(VigilError::Notify(format!(
                "HTTP {status}: {}",
                body.description.unwrap_or_else(|| "no description".into())
            )))
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        match self.try_send(text).await {
            Ok(()) => {
                debug!("[telegram] message delivered ({} bytes)", text.len());
                true
            }
            Err(e) => {
                warn!("[telegram] delivery failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> Secrets {
        Secrets { telegram_token: "123:abc".into(), telegram_channel: "-100".into() }
    }

    #[test]
    fn builds_send_url() {
        let n = TelegramNotifier::new("https://api.telegram.org/", &secrets()).unwrap();
        assert_eq!(n.send_url, "https://api.telegram.org/bot123:abc/sendMessage");
        assert_eq!(n.chat_id, "-100");
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_false() {
        // Bind an ephemeral port, then release it so nothing is listening there.
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let n = TelegramNotifier::new(&format!("http://127.0.0.1:{port}"), &secrets()).unwrap();
        assert!(!n.send("hello").await);
        assert!(matches!(n.try_send("hello").await, Err(VigilError::Notify(_))));
    }
}
