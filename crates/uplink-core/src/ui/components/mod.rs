//! UI components library

pub mod graph;

pub use graph::{DataBounds, Viewport, ViewportPadding};
