//! Chart geometry
//!
//! Maps chart data (timestamps in milliseconds, glucose values) onto the
//! pixel rectangle the chart is drawn in.

pub mod constants;
pub mod viewport;

pub use viewport::{DataBounds, Viewport, ViewportPadding};
