//! Constants for the status page module

use crate::config::HOUR_MS;

/// Space kept after the latest sample so it is not clipped by the right edge
pub(super) const WINDOW_TRAILING_PAD_MS: i64 = 90_000;

/// Shift applied to the window start before flooring to the minute
pub(super) const WINDOW_LEADING_SHIFT_MS: i64 = 150_000;

/// Y bounds of the chart when there are no samples (mg/dL)
pub(super) const EMPTY_WINDOW_MIN_Y: i32 = 80;
pub(super) const EMPTY_WINDOW_MAX_Y: i32 = 120;

/// mg/dL axis bounds are rounded to this step
pub(super) const MGDL_ROUND_STEP: i64 = 10;

/// mg/dL axis range is padded up to a multiple of this
pub(super) const MGDL_RANGE_STEP: i64 = 20;

/// mmol/L axis range is padded up to a multiple of this many half-mmol units
pub(super) const MMOL_RANGE_STEP: i64 = 4;

/// mg/dL per mmol/L, scaled by 1000 for exact integer conversion
pub(super) const MGDL_PER_MMOL_MILLI: i64 = 18_016;

/// History kept in the plotted set, measured back from the latest sample
pub(super) const PLOT_HISTORY_MS: i64 = 24 * HOUR_MS;

/// Pump status older than this is not shown in the headline
pub(super) const PUMP_STATUS_MAX_AGE_MS: i64 = HOUR_MS;

/// Chart area on the status screen in pixels
pub(super) const CHART_TOP_PX: i32 = 80;
pub(super) const CHART_WIDTH_PX: u32 = 320;
pub(super) const CHART_HEIGHT_PX: u32 = 160;
