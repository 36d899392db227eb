//! Shared value types for the chemix workspace.
//!
//! # Invariants
//! - Quantities are fixed-point with two fractional digits; no float drift.
//! - Colors are linear RGBA in `[0, 1]`.

pub mod color;
pub mod fixed;
pub mod types;

pub use color::{Color, ColorParseError};
pub use fixed::{FixedPoint2, ParseFixedPointError, QuantityRangeError};
pub use types::ROOM_TEMPERATURE;
