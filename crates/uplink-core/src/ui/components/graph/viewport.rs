//! Viewport and coordinate transformation utilities
//!
//! Handles transformation between data space (timestamps, glucose values in
//! mg/dL) and screen space (pixel coordinates).

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use super::constants::{
    DEFAULT_VIEWPORT_PADDING_BOTTOM_PX, DEFAULT_VIEWPORT_PADDING_LEFT_PX,
    DEFAULT_VIEWPORT_PADDING_RIGHT_PX, DEFAULT_VIEWPORT_PADDING_TOP_PX, MIN_DATA_RANGE,
};

/// Data space bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBounds {
    /// Earliest visible timestamp (ms)
    pub x_min: i64,
    /// Latest visible timestamp (ms)
    pub x_max: i64,
    /// Lowest visible value (mg/dL)
    pub y_min: i32,
    /// Highest visible value (mg/dL)
    pub y_max: i32,
}

impl DataBounds {
    pub const fn new(x_min: i64, x_max: i64, y_min: i32, y_max: i32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Get the X range (width)
    pub fn x_range(&self) -> i64 {
        (self.x_max - self.x_min).max(MIN_DATA_RANGE)
    }

    /// Get the Y range (height)
    pub fn y_range(&self) -> i64 {
        (self.y_max as i64 - self.y_min as i64).max(MIN_DATA_RANGE)
    }
}

/// Padding around the plot area for labels and margins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportPadding {
    /// Top padding in pixels
    pub top: u32,
    /// Right padding in pixels
    pub right: u32,
    /// Bottom padding in pixels
    pub bottom: u32,
    /// Left padding in pixels
    pub left: u32,
}

impl Default for ViewportPadding {
    fn default() -> Self {
        Self {
            top: DEFAULT_VIEWPORT_PADDING_TOP_PX,
            right: DEFAULT_VIEWPORT_PADDING_RIGHT_PX,
            bottom: DEFAULT_VIEWPORT_PADDING_BOTTOM_PX,
            left: DEFAULT_VIEWPORT_PADDING_LEFT_PX,
        }
    }
}

impl ViewportPadding {
    /// Create uniform padding on all sides
    pub const fn uniform(padding: u32) -> Self {
        Self {
            top: padding,
            right: padding,
            bottom: padding,
            left: padding,
        }
    }
}

/// Viewport for transforming data coordinates to screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Data space bounds
    data_bounds: DataBounds,
    /// Screen space bounds (full area including padding)
    screen_bounds: Rectangle,
    /// Padding around the plotting area
    padding: ViewportPadding,
}

impl Viewport {
    pub fn new(data_bounds: DataBounds, screen_bounds: Rectangle) -> Self {
        Self {
            data_bounds,
            screen_bounds,
            padding: ViewportPadding::default(),
        }
    }

    /// Create viewport with custom padding
    pub fn with_padding(mut self, padding: ViewportPadding) -> Self {
        self.padding = padding;
        self
    }

    /// Get the plot area (screen bounds minus padding)
    pub fn plot_area(&self) -> Rectangle {
        let top_left = Point::new(
            self.screen_bounds.top_left.x + self.padding.left as i32,
            self.screen_bounds.top_left.y + self.padding.top as i32,
        );

        let width = self
            .screen_bounds
            .size
            .width
            .saturating_sub(self.padding.left + self.padding.right);
        let height = self
            .screen_bounds
            .size
            .height
            .saturating_sub(self.padding.top + self.padding.bottom);

        Rectangle::new(top_left, Size::new(width, height))
    }

    /// Transform a sample to screen coordinates
    ///
    /// Returns None if the sample lies outside the data bounds
    pub fn data_to_screen(&self, timestamp: i64, value: i32) -> Option<Point> {
        let bounds = &self.data_bounds;
        if timestamp < bounds.x_min
            || timestamp > bounds.x_max
            || value < bounds.y_min
            || value > bounds.y_max
        {
            return None;
        }

        let plot_area = self.plot_area();
        let width = plot_area.size.width as i64;
        let height = plot_area.size.height as i64;

        // Screen Y increases downward
        let dx = (timestamp - bounds.x_min) * width / bounds.x_range();
        let dy = (bounds.y_max as i64 - value as i64) * height / bounds.y_range();

        Some(Point::new(
            plot_area.top_left.x + dx as i32,
            plot_area.top_left.y + dy as i32,
        ))
    }

    /// Milliseconds of data time covered by `pixels` horizontal pixels
    pub fn pixels_to_duration(&self, pixels: i32) -> i64 {
        let width = (self.plot_area().size.width as i64).max(1);
        pixels as i64 * self.data_bounds.x_range() / width
    }

    /// Get the data bounds
    pub fn data_bounds(&self) -> &DataBounds {
        &self.data_bounds
    }

    /// Get the screen bounds
    pub fn screen_bounds(&self) -> Rectangle {
        self.screen_bounds
    }
}
