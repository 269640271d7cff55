//! Rate-limited 24h ticker lookups.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use vigil_core::config::EndpointConfig;
use vigil_core::error::VigilError;
use vigil_core::rate_limit::RateLimiter;
use vigil_core::{ReferenceSnapshot, Segment};

use crate::ReferenceSource;

/// Raw `ticker/24hr` response; Binance encodes numbers as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    price_change_percent: String,
    quote_volume: String,
    last_price: String,
}

/// Binance 24h ticker client covering both segments.
pub struct BinanceReferenceClient {
    /// Shared HTTP client.
    http: reqwest::Client,
    futures_url: String,
    spot_url: String,
    /// Shared with any other REST caller; keyed by endpoint URL.
    limiter: Arc<RateLimiter>,
}

impl BinanceReferenceClient {
    pub fn new(endpoints: &EndpointConfig, limiter: Arc<RateLimiter>) -> Result<Self, VigilError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VigilError::Http(format!("client build failed: {e}")))?;
        Ok(Self {
            http,
            futures_url: endpoints.rest_url(Segment::Futures).to_string(),
            spot_url: endpoints.rest_url(Segment::Spot).to_string(),
            limiter,
        })
    }

    fn url(&self, segment: Segment) -> &str {
        match segment {
            Segment::Futures => &self.futures_url,
            Segment::Spot => &self.spot_url,
        }
    }
}

#[async_trait]
impl ReferenceSource for BinanceReferenceClient {
    async fn fetch_24h(&self, segment: Segment, symbol: &str) -> Result<ReferenceSnapshot, VigilError> {
        let url = self.url(segment);
        self.limiter.acquire(url).await;

        debug!("[{segment}] fetching 24h ticker for {symbol}");
        let resp = self
            .http
            .get(url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| VigilError::Http(format!("24h ticker request for {symbol}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VigilError::Http(format!("24h ticker for {symbol}: HTTP {status}")));
        }

        let body = resp.text().await.map_err(|e| VigilError::Http(format!("24h ticker body for {symbol}: {e}")))?;
        parse_ticker_24h(segment, symbol, &body)
    }
}

/// Decode a `ticker/24hr` body into a [`ReferenceSnapshot`].
pub fn parse_ticker_24h(segment: Segment, symbol: &str, body: &str) -> Result<ReferenceSnapshot, VigilError> {
    let raw: Ticker24h = serde_json::from_str(body)?;
    let num = |field: &str, s: &str| {
        s.parse::<f64>().map_err(|_| VigilError::Parse(format!("{field}={s:?} for {symbol}")))
    };
    Ok(ReferenceSnapshot {
        segment,
        symbol: symbol.to_string(),
        price_change_pct: num("priceChangePercent", &raw.price_change_percent)?,
        quote_volume: num("quoteVolume", &raw.quote_volume)?,
        last_price: num("lastPrice", &raw.last_price)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_futures_ticker() {
        let body = r#"{"symbol":"BTCUSDT","priceChange":"-94.99","priceChangePercent":"-0.254",
            "lastPrice":"37293.00","volume":"123.4","quoteVolume":"4602834567.12","openTime":1,"closeTime":2}"#;
        let snap = parse_ticker_24h(Segment::Futures, "BTCUSDT", body).unwrap();
        assert_eq!(snap.price_change_pct, -0.254);
        assert_eq!(snap.last_price, 37293.0);
        assert_eq!(snap.quote_volume, 4602834567.12);
        assert_eq!(snap.segment, Segment::Futures);
    }

    #[test]
    fn rejects_bad_numbers_and_errors() {
        let bad = r#"{"priceChangePercent":"x","lastPrice":"1","quoteVolume":"1"}"#;
        assert!(matches!(parse_ticker_24h(Segment::Spot, "ABCUSDT", bad), Err(VigilError::Parse(_))));

        let api_error = r#"{"code":-1121,"msg":"Invalid symbol."}"#;
        assert!(parse_ticker_24h(Segment::Spot, "ABCUSDT", api_error).is_err());
    }

    #[test]
    fn url_per_segment() {
        let client =
            BinanceReferenceClient::new(&EndpointConfig::default(), Arc::new(RateLimiter::new(10, Duration::from_secs(1))))
                .unwrap();
        assert!(client.url(Segment::Futures).contains("fapi"));
        assert!(client.url(Segment::Spot).contains("api/v3"));
    }
}
