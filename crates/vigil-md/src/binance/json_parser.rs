//! Binance JSON frame decoder.
//!
//! Data frames on the `!…@arr` streams are JSON arrays of event objects.
//! Anything that is not an array (subscription acks, errors, service
//! notices) is a control frame. Entries without a symbol, or quoted in a
//! different asset, are skipped.

use serde_json::Value;
use vigil_core::error::VigilError;
use vigil_core::{FeedEntry, TickerSnapshot, TradePrint, is_quoted_in};

use crate::json_util::f64_field_or_zero;

/// One decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Not a list: a control or service message.
    Control(Value),
    /// Accepted entries, in frame order. Empty if nothing survived filtering.
    Entries(Vec<FeedEntry>),
}

/// Decode one text frame, keeping only symbols quoted in `quote_suffix`.
pub fn decode_frame(text: &str, quote_suffix: &str) -> Result<Frame, VigilError> {
    let v: Value = serde_json::from_str(text)?;

    let Value::Array(items) = v else {
        return Ok(Frame::Control(v));
    };

    let entries = items.iter().filter_map(|item| parse_entry(item, quote_suffix)).collect();
    Ok(Frame::Entries(entries))
}

fn parse_entry(v: &Value, quote_suffix: &str) -> Option<FeedEntry> {
    let symbol = v.get("s")?.as_str()?;
    if !is_quoted_in(symbol, quote_suffix) {
        return None;
    }

    let entry = match v.get("e").and_then(Value::as_str) {
        Some("aggTrade") => FeedEntry::Trade(TradePrint {
            symbol: symbol.to_string(),
            price: f64_field_or_zero(v, "p"),
            qty: f64_field_or_zero(v, "q"),
            // Unknown side is treated as a maker-side buy: never a taker-buy alert.
            is_buyer_maker: v.get("m").and_then(Value::as_bool).unwrap_or(true),
        }),
        _ => FeedEntry::Ticker(TickerSnapshot {
            symbol: symbol.to_string(),
            last_price: f64_field_or_zero(v, "c"),
            price_change_pct: f64_field_or_zero(v, "P"),
            quote_volume_24h: f64_field_or_zero(v, "q"),
        }),
    };
    Some(entry)
}

/// Classification of a frame received while waiting for the subscription ack.
#[derive(Debug, Clone, PartialEq)]
pub enum AckStatus {
    /// `{"result": null, "id": <id>}`
    Ack,
    /// `{"error": {...}, "id": <id>}`: the subscription was refused.
    Rejected(String),
    /// Some other frame.
    Other,
}

/// Check whether `text` answers the subscribe request with id `id`.
pub fn classify_ack(text: &str, id: u64) -> AckStatus {
    let Ok(v) = serde_json::from_str::<Value>(text) else {
        return AckStatus::Other;
    };
    if v.get("id").and_then(Value::as_u64) != Some(id) {
        return AckStatus::Other;
    }
    match v.get("error") {
        Some(err) if !err.is_null() => AckStatus::Rejected(err.to_string()),
        _ if v.get("result").is_some() => AckStatus::Ack,
        _ => AckStatus::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKER_FRAME: &str = r#"[
        {"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","p":"120.5","P":"1.250","c":"37000.10","q":"10150000.5"},
        {"e":"24hrTicker","E":1700000000000,"s":"ETHBTC","P":"3.0","c":"0.05","q":"900"},
        {"e":"24hrTicker","E":1700000000000,"P":"3.0","c":"1","q":"2"},
        {"e":"24hrTicker","E":1700000000000,"s":"SOLUSDT","P":"oops","c":"55.5","q":"2000000"}
    ]"#;

    #[test]
    fn decodes_and_filters_ticker_entries() {
        let Frame::Entries(entries) = decode_frame(TICKER_FRAME, "USDT").unwrap() else {
            panic!("expected entries");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            FeedEntry::Ticker(TickerSnapshot {
                symbol: "BTCUSDT".into(),
                last_price: 37000.10,
                price_change_pct: 1.25,
                quote_volume_24h: 10150000.5,
            })
        );
        // Malformed percent reads as zero.
        match &entries[1] {
            FeedEntry::Ticker(t) => {
                assert_eq!(t.symbol, "SOLUSDT");
                assert_eq!(t.price_change_pct, 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decodes_agg_trades() {
        let frame = r#"[{"e":"aggTrade","s":"ETHUSDT","p":"2000","q":"600","m":false}]"#;
        let Frame::Entries(entries) = decode_frame(frame, "USDT").unwrap() else {
            panic!("expected entries");
        };
        match &entries[0] {
            FeedEntry::Trade(t) => {
                assert_eq!(t.notional(), 1_200_000.0);
                assert!(!t.is_buyer_maker);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_list_is_control() {
        let frame = decode_frame(r#"{"result":null,"id":1}"#, "USDT").unwrap();
        assert!(matches!(frame, Frame::Control(_)));
    }

    #[test]
    fn empty_list_has_no_entries() {
        assert_eq!(decode_frame("[]", "USDT").unwrap(), Frame::Entries(vec![]));
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(decode_frame("[{", "USDT"), Err(VigilError::Parse(_))));
    }

    #[test]
    fn ack_classification() {
        assert_eq!(classify_ack(r#"{"result":null,"id":1}"#, 1), AckStatus::Ack);
        assert_eq!(classify_ack(r#"{"result":null,"id":2}"#, 1), AckStatus::Other);
        assert!(matches!(
            classify_ack(r#"{"error":{"code":2,"msg":"Invalid request"},"id":1}"#, 1),
            AckStatus::Rejected(_)
        ));
        assert_eq!(classify_ack("[]", 1), AckStatus::Other);
        assert_eq!(classify_ack("not json", 1), AckStatus::Other);
    }
}
