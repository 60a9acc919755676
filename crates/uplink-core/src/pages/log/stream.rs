//! LogStream implementation and Page trait

use alloc::vec::Vec;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{debug, info};

use super::constants::{
    AUTO_SCROLL_JUMP_THRESHOLD, CONTROLS_TAIL_THRESHOLD, CURRENT_JUMP_DISTANCE, LOG_ROW_HEIGHT_PX,
    LOG_VIEWPORT_HEIGHT_PX, LOG_VIEWPORT_WIDTH_PX, SEARCH_JUMP_DISTANCE,
};
use super::scroll::ScrollState;
use crate::change_feed::{ChangeDiff, ChangeFeed, Subscription};
use crate::pages::Page;
use crate::storage::log_publisher::LogPublisher;
use crate::storage::{Clock, LogCategory, LogEntry, Query, Row, Table, Timestamp};
use crate::ui::core::{Action, PageId, TouchEvent, Touchable};

/// Categories the search control stops at in normal mode
const NORMAL_SEARCH: &[LogCategory] = &[LogCategory::Warn, LogCategory::Note];

/// Categories the search control stops at in extended mode
const EXTENDED_SEARCH: &[LogCategory] = &[LogCategory::Note];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Move instantly
    Jump,
    /// Scroll smoothly over several frames
    Animate,
}

/// A scroll the view performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollCommand {
    pub target_row: usize,
    pub mode: ScrollMode,
}

impl ScrollCommand {
    fn new(target_row: usize, jump: bool) -> Self {
        let mode = if jump {
            ScrollMode::Jump
        } else {
            ScrollMode::Animate
        };
        Self { target_row, mode }
    }
}

/// Rows and scroll state of the log view
///
/// The change feed callback mutates this directly.
pub struct LogView {
    rows: Vec<Row<LogEntry>>,
    scroll: ScrollState,
    auto_scroll: bool,
    extended: bool,
    controls_visible: bool,
    last_command: Option<ScrollCommand>,
    dirty: bool,
}

impl LogView {
    fn new(viewport: Rectangle) -> Self {
        Self {
            rows: Vec::new(),
            scroll: ScrollState::new(viewport, LOG_ROW_HEIGHT_PX),
            auto_scroll: true,
            extended: false,
            controls_visible: false,
            last_command: None,
            dirty: true,
        }
    }

    /// All rows in the current mode, oldest first
    pub fn rows(&self) -> &[Row<LogEntry>] {
        &self.rows
    }

    /// Rows at least partly inside the viewport
    pub fn visible_entries(&self) -> &[Row<LogEntry>] {
        &self.rows[self.scroll.visible_rows()]
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Whether the floating "current" and "search" controls are shown
    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    /// The most recent scroll the view performed
    pub fn last_command(&self) -> Option<ScrollCommand> {
        self.last_command
    }

    fn on_change(&mut self, rows: &[Row<LogEntry>], diff: ChangeDiff) {
        // Decide with the geometry from before the change is applied
        let follow = self.auto_scroll && self.scroll.remaining() < self.scroll.extent() / 2;

        self.set_rows(rows);
        if follow && !self.rows.is_empty() {
            let net = diff.inserted as i64 - diff.deleted as i64;
            let command = ScrollCommand::new(self.rows.len() - 1, net > AUTO_SCROLL_JUMP_THRESHOLD);
            self.apply(command);
        }
        self.update_controls();
    }

    fn set_rows(&mut self, rows: &[Row<LogEntry>]) {
        self.rows = rows.to_vec();
        self.scroll.set_row_count(self.rows.len());
        self.dirty = true;
    }

    fn apply(&mut self, command: ScrollCommand) {
        match command.mode {
            ScrollMode::Jump => self.scroll.jump_to_row(command.target_row),
            ScrollMode::Animate => self.scroll.animate_to_row(command.target_row),
        }
        self.last_command = Some(command);
        self.update_controls();
    }

    fn update_controls(&mut self) {
        let total = self.rows.len();
        let visible = self
            .scroll
            .first_visible()
            .is_some_and(|first| first < total && total - first > CONTROLS_TAIL_THRESHOLD);
        if visible != self.controls_visible {
            debug!(" Log controls visible: {}", visible);
            self.controls_visible = visible;
            self.dirty = true;
        }
    }
}

/// Filtered, auto-scrolling view over the log table
pub struct LogStream<'s> {
    view: LogView,
    feed: ChangeFeed<'s, LogEntry, LogView>,
    subscription: Option<Subscription>,
}

impl<'s> LogStream<'s> {
    pub fn new() -> Self {
        Self::with_viewport(Rectangle::new(
            Point::zero(),
            Size::new(LOG_VIEWPORT_WIDTH_PX, LOG_VIEWPORT_HEIGHT_PX),
        ))
    }

    pub fn with_viewport(viewport: Rectangle) -> Self {
        Self {
            view: LogView::new(viewport),
            feed: ChangeFeed::new(),
            subscription: None,
        }
    }

    /// Begin following the log in normal or extended mode
    ///
    /// Enables auto-scroll, hides the floating controls, asks the publisher to
    /// evict stale entries and shows the newest entry.
    pub fn start<C: Clock>(
        &mut self,
        table: &'s Table<LogEntry>,
        publisher: &LogPublisher<'_, C>,
        extended: bool,
    ) {
        self.unsubscribe();
        self.view.extended = extended;
        self.view.auto_scroll = true;
        self.view.controls_visible = false;

        publisher.evict_stale();

        let query = Query::all().filter(move |entry: &LogEntry| entry.is_visible(extended));
        let subscription = self.feed.subscribe(table, query, LogView::on_change);
        self.view
            .set_rows(self.feed.snapshot(&subscription).unwrap_or_default());
        self.subscription = Some(subscription);

        self.focus_current();
        info!(" Log stream started (extended: {})", extended);
    }

    /// Hide the controls, release the live query and drop the rows
    pub fn stop(&mut self) {
        self.view.controls_visible = false;
        self.unsubscribe();
        self.view.set_rows(&[]);
        self.view.last_command = None;
        info!(" Log stream stopped");
    }

    fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            self.feed.unsubscribe(&mut subscription);
        }
    }

    pub fn is_started(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn view(&self) -> &LogView {
        &self.view
    }

    /// Deliver pending store changes; returns true if the view changed
    pub fn on_store_changed(&mut self) -> bool {
        self.feed.dispatch(&mut self.view) > 0
    }

    /// Jump to the newest entry
    pub fn focus_current(&mut self) -> Option<ScrollCommand> {
        let last = self.view.rows.len().checked_sub(1)?;
        let command = ScrollCommand::new(last, true);
        self.view.apply(command);
        Some(command)
    }

    /// The "current" control: scroll to the newest entry, jumping when it is
    /// far away
    pub fn focus_current_tap(&mut self) -> Option<ScrollCommand> {
        let total = self.view.rows.len();
        let visible = self.view.scroll.visible_count();
        if visible == 0 {
            return None;
        }
        let first = self.view.scroll.first_visible()?;
        let unseen = total.saturating_sub(visible + first);

        let command = ScrollCommand::new(total - 1, unseen > CURRENT_JUMP_DISTANCE);
        self.view.apply(command);
        Some(command)
    }

    /// The "search" control: scroll to the nearest earlier warning or note
    /// (notes only in extended mode)
    pub fn search(&mut self) -> Option<ScrollCommand> {
        let categories = if self.view.extended {
            EXTENDED_SEARCH
        } else {
            NORMAL_SEARCH
        };
        self.search_before(categories, false)
    }

    /// Long press on the "search" control: scroll to the previous session
    /// start (previous note in extended mode), or to the top if there is none
    pub fn search_sessions(&mut self) -> Option<ScrollCommand> {
        let category = if self.view.extended {
            LogCategory::Note
        } else {
            LogCategory::Startup
        };
        self.search_before(&[category], true)
    }

    fn search_before(
        &mut self,
        categories: &[LogCategory],
        top_if_none: bool,
    ) -> Option<ScrollCommand> {
        let view = &mut self.view;
        let first = view.scroll.first_visible()?;
        let from: Timestamp = view.rows[first].value.timestamp;

        let found = view.rows.iter().rposition(|row| {
            row.value.timestamp < from && categories.contains(&row.value.category)
        });
        let target = match found {
            // Leave a quarter of the viewport of context above the match
            Some(index) => index.saturating_sub((view.scroll.visible_count() / 4).max(1)),
            None if top_if_none => 0,
            None => return None,
        };

        let command = ScrollCommand::new(target, first.abs_diff(target) > SEARCH_JUMP_DISTANCE);
        view.apply(command);
        debug!(" Log search scrolled to row {}", target);
        Some(command)
    }
}

impl Default for LogStream<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for LogStream<'_> {
    fn id(&self) -> PageId {
        PageId::Log
    }

    fn title(&self) -> &str {
        "Log"
    }

    fn handle_touch(&mut self, event: TouchEvent) -> Option<Action> {
        let view = &mut self.view;
        if !view.scroll.contains_point(event.point()) && !view.scroll.is_touched() {
            return None;
        }

        // No auto-scroll while a finger is on the view
        view.auto_scroll = matches!(event, TouchEvent::Release(_));
        view.scroll.handle_touch(event);
        view.update_controls();
        None
    }

    fn update(&mut self, _now: Timestamp) {
        if self.view.scroll.step_animation() {
            self.view.update_controls();
        }
    }

    fn is_dirty(&self) -> bool {
        self.view.dirty || self.view.scroll.is_dirty()
    }

    fn mark_clean(&mut self) {
        self.view.dirty = false;
        self.view.scroll.mark_clean();
    }
}
