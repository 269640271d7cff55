//! Core data types shared by the feed, detection, and delivery crates.
//!
//! Everything here is plain owned data: parsed feed entries, alert events,
//! and the segment / connection-state enums.

pub mod alert;
pub mod enums;
pub mod market_data;
pub mod symbol;

pub use alert::*;
pub use enums::*;
pub use market_data::*;
pub use symbol::*;
