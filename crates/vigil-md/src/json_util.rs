//! JSON field helpers for exchange payloads.
//!
//! Exchanges encode numbers either as JSON strings (`"30000.5"`) or native
//! numbers (`30000.5`); these helpers accept both.

/// Parse a JSON value (string or number) as `f64`.
#[inline]
pub fn parse_str_f64(v: Option<&serde_json::Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s).ok()
    } else {
        v.as_f64()
    }
}

/// Parse a named field on a JSON object as `f64` (string or number).
#[inline]
pub fn parse_f64_field(v: &serde_json::Value, key: &str) -> Option<f64> {
    parse_str_f64(v.get(key))
}

/// Like [`parse_f64_field`], but a missing or malformed value reads as zero.
#[inline]
pub fn f64_field_or_zero(v: &serde_json::Value, key: &str) -> f64 {
    parse_f64_field(v, key).filter(|x| x.is_finite()).unwrap_or(0.0)
}
