//! Constants for the log stream module

/// Height of one log row in pixels
pub(super) const LOG_ROW_HEIGHT_PX: u32 = 20;

/// Log area on the log screen in pixels
pub(super) const LOG_VIEWPORT_WIDTH_PX: u32 = 320;
pub(super) const LOG_VIEWPORT_HEIGHT_PX: u32 = 240;

/// Distance an animated scroll advances per frame in pixels
pub(super) const SCROLL_ANIMATION_STEP_PX: i32 = 40;

/// Net rows added by one change above which auto-scroll jumps instead of
/// animating
pub(super) const AUTO_SCROLL_JUMP_THRESHOLD: i64 = 2;

/// Rows between the first visible row and the newest row above which the
/// "current" control jumps instead of animating
pub(super) const CURRENT_JUMP_DISTANCE: usize = 200;

/// Rows between the first visible row and a search match above which the
/// search jumps instead of animating
pub(super) const SEARCH_JUMP_DISTANCE: usize = 400;

/// Unseen rows below the first visible row above which the floating controls
/// are shown
pub(super) const CONTROLS_TAIL_THRESHOLD: usize = 20;
