//! Chart axis bounds

use log::debug;

use super::constants::{
    EMPTY_WINDOW_MAX_Y, EMPTY_WINDOW_MIN_Y, MGDL_PER_MMOL_MILLI, MGDL_RANGE_STEP, MGDL_ROUND_STEP,
    MMOL_RANGE_STEP, PLOT_HISTORY_MS, WINDOW_LEADING_SHIFT_MS, WINDOW_TRAILING_PAD_MS,
};
use crate::config::{GlucoseUnit, ZoomLevel};
use crate::scheduler::MINUTE_MS;
use crate::storage::{Sample, Timestamp};
use crate::ui::components::graph::DataBounds;

/// Axis bounds of the chart
///
/// Y bounds are always in mg/dL; in mmol/L mode they are chosen so that they
/// land on round half-mmol values after conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayWindow {
    pub min_x: Timestamp,
    pub max_x: Timestamp,
    pub min_y: i32,
    pub max_y: i32,
    pub zoom: ZoomLevel,
    pub unit: GlucoseUnit,
}

impl DisplayWindow {
    /// Same window moved along the time axis
    pub fn shifted(self, offset_ms: i64) -> Self {
        Self {
            min_x: self.min_x + offset_ms,
            max_x: self.max_x + offset_ms,
            ..self
        }
    }

    pub fn bounds(&self) -> DataBounds {
        DataBounds::new(self.min_x, self.max_x, self.min_y, self.max_y)
    }

    pub fn contains(&self, sample: &Sample) -> bool {
        (self.min_x..=self.max_x).contains(&sample.timestamp)
            && (self.min_y..=self.max_y).contains(&sample.value)
    }
}

/// Computes the chart window and tracks user panning
#[derive(Debug, Default)]
pub struct WindowCalculator {
    /// Offset applied to the computed window, zero or negative
    pan_offset: i64,
}

impl WindowCalculator {
    pub const fn new() -> Self {
        Self { pan_offset: 0 }
    }

    /// Compute the window for an ordered sample sequence
    pub fn compute(
        samples: &[Sample],
        zoom: ZoomLevel,
        unit: GlucoseUnit,
        now: Timestamp,
    ) -> DisplayWindow {
        let Some(latest) = samples.last() else {
            return DisplayWindow {
                min_x: now - zoom.duration_ms(),
                max_x: now,
                min_y: EMPTY_WINDOW_MIN_Y,
                max_y: EMPTY_WINDOW_MAX_Y,
                zoom,
                unit,
            };
        };

        let t = latest.timestamp;
        let min_x = floor_to_minute(t + WINDOW_LEADING_SHIFT_MS - zoom.duration_ms());
        let max_x = t + WINDOW_TRAILING_PAD_MS;

        let (lo, hi) = value_range(samples.iter().filter(|s| s.timestamp > min_x))
            .or_else(|| value_range(samples.iter()))
            .unwrap_or((EMPTY_WINDOW_MIN_Y, EMPTY_WINDOW_MAX_Y));

        let (min_y, max_y) = match unit {
            GlucoseUnit::MgDl => mgdl_bounds(lo, hi),
            GlucoseUnit::Mmol => mmol_bounds(lo, hi),
        };

        DisplayWindow {
            min_x,
            max_x,
            min_y,
            max_y,
            zoom,
            unit,
        }
    }

    /// Compute the window and apply the current pan offset
    pub fn window(
        &self,
        samples: &[Sample],
        zoom: ZoomLevel,
        unit: GlucoseUnit,
        now: Timestamp,
    ) -> DisplayWindow {
        Self::compute(samples, zoom, unit, now).shifted(self.pan_offset)
    }

    /// Move the window along the time axis; negative goes back in time
    ///
    /// Panning never goes past the latest sample or further back than the
    /// plotted history.
    pub fn pan_by(&mut self, offset_ms: i64) {
        self.pan_offset = (self.pan_offset + offset_ms).clamp(-PLOT_HISTORY_MS, 0);
    }

    /// Drop any panning so the window follows the latest sample again
    pub fn jump_to_now(&mut self) {
        if self.pan_offset != 0 {
            debug!(" Chart jumped to now");
        }
        self.pan_offset = 0;
    }

    pub fn is_panned(&self) -> bool {
        self.pan_offset != 0
    }

    pub fn pan_offset(&self) -> i64 {
        self.pan_offset
    }
}

/// The samples plotted on the chart: the last day, measured from the latest
pub fn chart_samples(samples: &[Sample]) -> &[Sample] {
    let Some(latest) = samples.last() else {
        return samples;
    };
    let from = latest.timestamp - PLOT_HISTORY_MS;
    let start = samples.partition_point(|s| s.timestamp <= from);
    &samples[start..]
}

fn floor_to_minute(timestamp: Timestamp) -> Timestamp {
    timestamp - timestamp.rem_euclid(MINUTE_MS)
}

fn value_range<'a>(samples: impl Iterator<Item = &'a Sample>) -> Option<(i32, i32)> {
    samples.fold(None, |range, sample| match range {
        None => Some((sample.value, sample.value)),
        Some((lo, hi)) => Some((lo.min(sample.value), hi.max(sample.value))),
    })
}

/// Pad `[lo, hi]` to a range that is a strict multiple of `step` above the
/// input range, splitting the slack evenly with any odd unit above
fn pad_range(lo: i64, hi: i64, step: i64) -> (i64, i64) {
    let range = hi - lo;
    let min_range = (range / step + 1) * step;
    let lo = lo - (min_range - range) / 2;
    (lo, lo + min_range)
}

fn mgdl_bounds(lo: i32, hi: i32) -> (i32, i32) {
    let lo = (lo as i64).div_euclid(MGDL_ROUND_STEP) * MGDL_ROUND_STEP;
    let hi = ceil_div(hi as i64, MGDL_ROUND_STEP) * MGDL_ROUND_STEP;
    let (lo, hi) = pad_range(lo, hi, MGDL_RANGE_STEP);
    (lo as i32, hi as i32)
}

fn mmol_bounds(lo: i32, hi: i32) -> (i32, i32) {
    // Half-mmol units: mg/dL * 2 / 18.016
    let lo = (lo as i64 * 2_000).div_euclid(MGDL_PER_MMOL_MILLI);
    let hi = ceil_div(hi as i64 * 2_000, MGDL_PER_MMOL_MILLI);
    let (lo, hi) = pad_range(lo, hi, MMOL_RANGE_STEP);
    let to_mgdl = |half_mmol: i64| (half_mmol * MGDL_PER_MMOL_MILLI).div_euclid(2_000) as i32;
    (to_mgdl(lo), to_mgdl(hi))
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    -(-value).div_euclid(divisor)
}
