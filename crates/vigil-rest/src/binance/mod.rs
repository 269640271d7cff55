//! Binance REST reference data.
//!
//! | Segment | Method | URL                                          |
//! |---------|--------|----------------------------------------------|
//! | Futures | GET    | `https://fapi.binance.com/fapi/v1/ticker/24hr` |
//! | Spot    | GET    | `https://api.binance.com/api/v3/ticker/24hr`   |

pub mod reference;

pub use reference::BinanceReferenceClient;
