//! Page trait shared by the status page and the log stream

use crate::storage::Timestamp;
use crate::ui::core::{Action, PageId, TouchEvent};

/// Trait for pages that can be interacted with
pub trait Page {
    /// Get the unique identifier for this page
    fn id(&self) -> PageId;

    /// Get the title of this page
    fn title(&self) -> &str;

    /// Handle touch events, return action if any
    fn handle_touch(&mut self, event: TouchEvent) -> Option<Action>;

    /// Advance time-driven state (called once per UI frame)
    fn update(&mut self, now: Timestamp);

    /// Check if the page changed since it was last drawn
    fn is_dirty(&self) -> bool;

    /// Mark the page as drawn
    fn mark_clean(&mut self);
}
