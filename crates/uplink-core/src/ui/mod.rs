//! Touch model and display geometry shared by the pages
//!
//! No drawing backend is selected here. Pages expose plain state (plot points,
//! row ranges, scroll offsets) and a renderer of the integrator's choosing
//! draws it.

pub mod components;
pub mod core;

pub use core::{Action, PageId, TouchEvent, TouchPoint, TouchResult, Touchable};
