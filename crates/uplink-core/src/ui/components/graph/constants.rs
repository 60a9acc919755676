//! Constants for chart geometry
//!
//! All magic numbers are defined here with descriptive names and units.

/// Default viewport padding for top edge in pixels
pub const DEFAULT_VIEWPORT_PADDING_TOP_PX: u32 = 5;

/// Default viewport padding for right edge in pixels
pub const DEFAULT_VIEWPORT_PADDING_RIGHT_PX: u32 = 10;

/// Default viewport padding for bottom edge in pixels (time axis labels)
pub const DEFAULT_VIEWPORT_PADDING_BOTTOM_PX: u32 = 20;

/// Default viewport padding for left edge in pixels (value axis labels)
pub const DEFAULT_VIEWPORT_PADDING_LEFT_PX: u32 = 30;

/// Smallest data range used as a divisor (prevents division by zero)
pub const MIN_DATA_RANGE: i64 = 1;
