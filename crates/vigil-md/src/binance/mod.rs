//! Binance stream names and subscription messages.
//!
//! Both segments use the same all-market streams:
//! - `!ticker@arr` — rolling 24h ticker for every symbol that changed (~1 s)
//! - `!aggTrade@arr` — aggregate trades, only when large-trade alerts are on

pub mod json_parser;

/// All-market 24h ticker stream.
pub const TICKER_STREAM: &str = "!ticker@arr";

/// All-market aggregate trade stream.
pub const AGG_TRADE_STREAM: &str = "!aggTrade@arr";

/// Request id used for the subscription; the ack echoes it back.
pub const SUBSCRIBE_ID: u64 = 1;

/// Streams to subscribe for one segment.
pub fn streams(large_trades: bool) -> Vec<String> {
    let mut streams = vec![TICKER_STREAM.to_string()];
    if large_trades {
        streams.push(AGG_TRADE_STREAM.to_string());
    }
    streams
}

/// Build the `SUBSCRIBE` control message.
pub fn build_subscribe(streams: &[String]) -> String {
    serde_json::json!({
        "method": "SUBSCRIBE",
        "params": streams,
        "id": SUBSCRIBE_ID
    })
    .to_string()
}
