//! Symbol identity helpers.

use super::enums::Segment;

/// Identifies one independent volume-tracking stream: `(segment, symbol)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolKey {
    pub segment: Segment,
    pub symbol: String,
}

impl SymbolKey {
    pub fn new(segment: Segment, symbol: impl Into<String>) -> Self {
        Self { segment, symbol: symbol.into() }
    }
}

impl std::fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.segment, self.symbol)
    }
}

/// Returns `true` if `symbol` is quoted in `suffix` (e.g. `"BTCUSDT"` / `"USDT"`).
///
/// A symbol equal to the suffix itself has no base asset and is rejected.
#[inline]
pub fn is_quoted_in(symbol: &str, suffix: &str) -> bool {
    symbol.len() > suffix.len() && symbol.ends_with(suffix)
}
