//! Vertical scroll state for a list of fixed-height rows

use core::ops::Range;

use embedded_graphics::primitives::{ContainsPoint, Rectangle};

use super::constants::SCROLL_ANIMATION_STEP_PX;
use crate::ui::core::{TouchEvent, TouchPoint, TouchResult, Touchable};

/// Scroll position over `row_count` rows of `row_height` pixels
pub struct ScrollState {
    /// Visible bounds (viewport)
    viewport: Rectangle,
    row_height: u32,
    row_count: usize,
    /// Pixel offset of the viewport top from the content top
    offset: i32,
    /// Offset an animated scroll is heading to
    animation_target: Option<i32>,
    /// Last touch position for drag scrolling
    last_touch: Option<TouchPoint>,
    dirty: bool,
}

impl ScrollState {
    pub fn new(viewport: Rectangle, row_height: u32) -> Self {
        Self {
            viewport,
            row_height: row_height.max(1),
            row_count: 0,
            offset: 0,
            animation_target: None,
            last_touch: None,
            dirty: true,
        }
    }

    /// Set the number of rows; the offset is clamped to the new content
    pub fn set_row_count(&mut self, row_count: usize) {
        if self.row_count != row_count {
            self.row_count = row_count;
            self.offset = self.constrain(self.offset);
            self.animation_target = self.animation_target.map(|t| self.constrain(t));
            self.dirty = true;
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Total content height in pixels
    pub fn range(&self) -> i32 {
        self.row_count as i32 * self.row_height as i32
    }

    /// Current scroll offset in pixels
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Visible height in pixels
    pub fn extent(&self) -> i32 {
        self.viewport.size.height as i32
    }

    /// Content below the bottom edge of the viewport, in pixels
    pub fn remaining(&self) -> i32 {
        self.range() - self.offset - self.extent()
    }

    fn max_offset(&self) -> i32 {
        (self.range() - self.extent()).max(0)
    }

    /// Constrain scroll to valid bounds
    fn constrain(&self, offset: i32) -> i32 {
        offset.clamp(0, self.max_offset())
    }

    /// Index of the topmost (possibly partly) visible row
    pub fn first_visible(&self) -> Option<usize> {
        if self.row_count == 0 {
            return None;
        }
        let index = (self.offset / self.row_height as i32) as usize;
        Some(index.min(self.row_count - 1))
    }

    /// Rows at least partly inside the viewport
    pub fn visible_rows(&self) -> Range<usize> {
        let Some(first) = self.first_visible() else {
            return 0..0;
        };
        let bottom = self.offset + self.extent() - 1;
        let last = (bottom.max(0) / self.row_height as i32) as usize;
        first..(last + 1).min(self.row_count)
    }

    /// Number of rows at least partly inside the viewport
    pub fn visible_count(&self) -> usize {
        self.visible_rows().len()
    }

    /// Scroll by a delta amount
    pub fn scroll_by(&mut self, delta: i32) {
        self.set_offset(self.offset + delta);
    }

    /// Put `index` at the top of the viewport (or as close as the content allows)
    pub fn jump_to_row(&mut self, index: usize) {
        self.set_offset(index as i32 * self.row_height as i32);
    }

    /// Start an animated scroll towards `index`
    pub fn animate_to_row(&mut self, index: usize) {
        let target = self.constrain(index as i32 * self.row_height as i32);
        self.animation_target = (target != self.offset).then_some(target);
    }

    pub fn is_animating(&self) -> bool {
        self.animation_target.is_some()
    }

    /// Advance an animated scroll by one frame; returns true if it moved
    pub fn step_animation(&mut self) -> bool {
        let Some(target) = self.animation_target else {
            return false;
        };
        let delta = (target - self.offset).clamp(-SCROLL_ANIMATION_STEP_PX, SCROLL_ANIMATION_STEP_PX);
        self.offset += delta;
        if self.offset == target {
            self.animation_target = None;
        }
        self.dirty = true;
        delta != 0
    }

    fn set_offset(&mut self, offset: i32) {
        self.offset = self.constrain(offset);
        self.animation_target = None;
        self.dirty = true;
    }

    /// Whether a finger is currently down on the view
    pub fn is_touched(&self) -> bool {
        self.last_touch.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Touchable for ScrollState {
    fn contains_point(&self, point: TouchPoint) -> bool {
        self.viewport.contains(point.to_point())
    }

    fn handle_touch(&mut self, event: TouchEvent) -> TouchResult {
        match event {
            TouchEvent::Press(point) | TouchEvent::LongPress(point) => {
                if self.contains_point(point) {
                    self.last_touch = Some(point);
                    self.animation_target = None;
                    TouchResult::Handled
                } else {
                    TouchResult::NotHandled
                }
            }
            TouchEvent::Drag(point) => {
                if let Some(last) = self.last_touch {
                    // Dragging up moves the content up
                    self.scroll_by(last.y as i32 - point.y as i32);
                    self.last_touch = Some(point);
                    TouchResult::Handled
                } else {
                    TouchResult::NotHandled
                }
            }
            TouchEvent::Release(_) => {
                if self.last_touch.take().is_some() {
                    TouchResult::Handled
                } else {
                    TouchResult::NotHandled
                }
            }
        }
    }
}
