//! Core touch types for the uplink UI

use embedded_graphics::prelude::*;

/// Represents a 2D touch point on the display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
}

impl TouchPoint {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn to_point(&self) -> Point {
        Point::new(self.x as i32, self.y as i32)
    }
}

/// Touch events delivered to the pages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    /// Initial touch press at a point
    Press(TouchPoint),
    /// Touch drag to a new point
    Drag(TouchPoint),
    /// Finger lifted (or the gesture was cancelled)
    Release(TouchPoint),
    /// Press held in place past the long-press threshold
    LongPress(TouchPoint),
}

impl TouchEvent {
    pub fn point(&self) -> TouchPoint {
        match *self {
            Self::Press(p) | Self::Drag(p) | Self::Release(p) | Self::LongPress(p) => p,
        }
    }
}

/// Result from handling a touch event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchResult {
    /// Event was handled by this element
    Handled,
    /// Event was not handled, pass to next element
    NotHandled,
    /// Event triggered an action
    Action(Action),
}

/// Actions that UI elements can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Advance the chart to the next zoom level
    CycleZoom,
    /// Drop any chart panning and show the latest samples
    JumpToNow,
    /// Scroll the log to the newest entry
    FocusCurrentLog,
    /// Scroll the log to the previous warning or note
    SearchLog,
    /// Scroll the log to the previous session start
    SearchLogSessions,
}

/// Page identifier for routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageId {
    Status,
    Log,
}

/// Trait for UI elements that respond to touch events
pub trait Touchable {
    /// Check if a point is within this element's bounds
    fn contains_point(&self, point: TouchPoint) -> bool;

    /// Handle a touch event, returns result indicating if handled and any action
    fn handle_touch(&mut self, event: TouchEvent) -> TouchResult;
}
