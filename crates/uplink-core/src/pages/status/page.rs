//! StatusPage implementation and Page trait

use alloc::vec::Vec;

use embassy_time::Duration;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{debug, info};

use super::constants::{CHART_HEIGHT_PX, CHART_TOP_PX, CHART_WIDTH_PX, PUMP_STATUS_MAX_AGE_MS};
use super::trend::{TrendClassifier, TrendIndicator};
use super::window::{DisplayWindow, WindowCalculator, chart_samples};
use crate::change_feed::{ChangeFeed, Subscription};
use crate::config::{GlucoseUnit, Preferences, ZoomLevel};
use crate::metrics::{BatteryLevel, GlucoseBand};
use crate::pages::Page;
use crate::scheduler::{MINUTE_MS, RefreshScheduler, RefreshTarget};
use crate::storage::{PumpStatus, Query, Row, Sample, Store, Timestamp};
use crate::ui::components::graph::Viewport;
use crate::ui::core::{Action, PageId, TouchEvent, TouchPoint};

/// Time since the latest reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingAge {
    /// No reading yet
    Never,
    /// Whole minutes since the latest reading
    Minutes(i64),
}

impl ReadingAge {
    pub fn since(last_sample: Option<Timestamp>, now: Timestamp) -> Self {
        match last_sample {
            Some(last) => Self::Minutes((now - last).max(0) / MINUTE_MS),
            None => Self::Never,
        }
    }
}

/// Readouts shown above the chart
///
/// Values are raw; the formatting collaborator renders them in the user's
/// unit and locale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Headline {
    /// Latest sensor glucose in mg/dL
    pub value: Option<i32>,
    pub unit: GlucoseUnit,
    pub trend: TrendIndicator,
    pub is_estimate: bool,
    pub age: ReadingAge,
    /// Active insulin in units, zero without a recent pump status
    pub active_insulin: f32,
    pub battery: BatteryLevel,
}

impl Default for Headline {
    fn default() -> Self {
        Self {
            value: None,
            unit: GlucoseUnit::default(),
            trend: TrendIndicator::default(),
            is_estimate: false,
            age: ReadingAge::Never,
            active_insulin: 0.0,
            battery: BatteryLevel::Unknown,
        }
    }
}

/// A sample positioned on the chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub position: Point,
    pub color: Rgb565,
    pub radius: f32,
}

/// Derived display state of the status page
///
/// Change feed callbacks and scheduler firings mutate this directly.
pub struct StatusState {
    samples: Vec<Sample>,
    pump: Option<PumpStatus>,
    prefs: Preferences,
    calculator: WindowCalculator,
    window: DisplayWindow,
    headline: Headline,
    chart_bounds: Rectangle,
    indicator_attached: bool,
    restart_refresh: bool,
    last_touch: Option<TouchPoint>,
    now: Timestamp,
    dirty: bool,
}

impl StatusState {
    fn new(chart_bounds: Rectangle, prefs: Preferences) -> Self {
        Self {
            samples: Vec::new(),
            pump: None,
            prefs,
            calculator: WindowCalculator::new(),
            window: WindowCalculator::compute(&[], prefs.zoom, prefs.unit, 0),
            headline: Headline::default(),
            chart_bounds,
            indicator_attached: false,
            restart_refresh: false,
            last_touch: None,
            now: 0,
            dirty: true,
        }
    }

    fn load_samples(&mut self, rows: &[Row<Sample>]) {
        self.samples = rows.iter().map(|row| row.value).collect();
        self.recompute();
    }

    fn load_pump(&mut self, rows: &[Row<PumpStatus>]) {
        self.pump = rows.last().map(|row| row.value);
        self.refresh_pump();
    }

    /// Recompute the chart window and the sample readouts
    fn recompute(&mut self) {
        self.window = self.calculator.window(
            chart_samples(&self.samples),
            self.prefs.zoom,
            self.prefs.unit,
            self.now,
        );

        let latest = self.samples.last();
        self.headline.value = latest.map(|s| s.value);
        self.headline.unit = self.prefs.unit;
        self.headline.trend = TrendClassifier::classify(latest.and_then(|s| s.trend));
        self.headline.is_estimate = latest.is_some_and(|s| s.is_estimate);
        self.headline.age = ReadingAge::since(self.last_sample_time(), self.now);
        self.dirty = true;
    }

    fn refresh_pump(&mut self) {
        let recent = self
            .pump
            .filter(|status| status.timestamp >= self.now - PUMP_STATUS_MAX_AGE_MS);
        self.headline.active_insulin = recent.map_or(0.0, |status| status.active_insulin);
        self.headline.battery = BatteryLevel::from_percent(recent.and_then(|s| s.battery_percent));
        self.dirty = true;
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.window.bounds(), self.chart_bounds)
    }
}

impl RefreshTarget for StatusState {
    fn is_ready(&self) -> bool {
        self.indicator_attached
    }

    fn last_sample_time(&self) -> Option<Timestamp> {
        self.samples.last().map(|s| s.timestamp)
    }

    fn refresh(&mut self, now: Timestamp) {
        self.now = now;
        self.headline.age = ReadingAge::since(self.last_sample_time(), now);
        self.dirty = true;
    }

    fn refresh_indicator(&mut self, _now: Timestamp) {
        self.refresh_pump();
    }
}

/// Glucose chart and headline readouts
pub struct StatusPage<'s> {
    state: StatusState,
    cgm: ChangeFeed<'s, Sample, StatusState>,
    pump: ChangeFeed<'s, PumpStatus, StatusState>,
    cgm_subscription: Option<Subscription>,
    pump_subscription: Option<Subscription>,
    scheduler: RefreshScheduler,
}

impl<'s> StatusPage<'s> {
    pub fn new(prefs: Preferences) -> Self {
        let chart_bounds = Rectangle::new(
            Point::new(0, CHART_TOP_PX),
            Size::new(CHART_WIDTH_PX, CHART_HEIGHT_PX),
        );
        Self::with_chart_bounds(chart_bounds, prefs)
    }

    pub fn with_chart_bounds(chart_bounds: Rectangle, prefs: Preferences) -> Self {
        Self {
            state: StatusState::new(chart_bounds, prefs),
            cgm: ChangeFeed::new(),
            pump: ChangeFeed::new(),
            cgm_subscription: None,
            pump_subscription: None,
            scheduler: RefreshScheduler::new(),
        }
    }

    /// Subscribe to the sample and pump tables and start the refresh timer
    pub fn start(&mut self, store: &'s Store, now: Timestamp) {
        self.unsubscribe();
        self.state.now = now;

        let cgm = self.cgm.subscribe(
            &store.samples,
            Query::all().filter(|sample: &Sample| sample.value != 0),
            |state, rows, diff| {
                if diff.inserted + diff.updated > 0 {
                    state.load_samples(rows);
                    state.restart_refresh = true;
                }
            },
        );
        let pump = self
            .pump
            .subscribe(&store.pump, Query::all(), |state, rows, diff| {
                if diff.inserted > 0 {
                    state.load_pump(rows);
                }
            });

        self.state
            .load_samples(self.cgm.snapshot(&cgm).unwrap_or_default());
        self.state
            .load_pump(self.pump.snapshot(&pump).unwrap_or_default());
        self.cgm_subscription = Some(cgm);
        self.pump_subscription = Some(pump);

        self.scheduler.start(now);
        info!(" Status page started");
    }

    /// Cancel the refresh timer; no firings happen after this returns
    pub fn cancel_refresh(&mut self) {
        self.scheduler.cancel();
    }

    /// Release both live queries; no callbacks fire after this returns
    pub fn unsubscribe(&mut self) {
        if let Some(mut subscription) = self.cgm_subscription.take() {
            self.cgm.unsubscribe(&mut subscription);
        }
        if let Some(mut subscription) = self.pump_subscription.take() {
            self.pump.unsubscribe(&mut subscription);
        }
    }

    /// Tear down in reverse order of `start`
    pub fn stop(&mut self) {
        self.cancel_refresh();
        self.unsubscribe();
        info!(" Status page stopped");
    }

    pub fn is_started(&self) -> bool {
        self.cgm_subscription.is_some()
    }

    /// Deliver pending store changes; returns true if the page changed
    pub fn on_store_changed(&mut self, now: Timestamp) -> bool {
        self.state.now = now;
        let fired = self.cgm.dispatch(&mut self.state) + self.pump.dispatch(&mut self.state);

        if self.state.restart_refresh {
            self.state.restart_refresh = false;
            self.scheduler.start(now);
        }
        fired > 0
    }

    /// Run the refresh timer if it is due
    pub fn poll_refresh(&mut self, now: Timestamp) -> Option<Duration> {
        self.scheduler.fire(now, &mut self.state)
    }

    pub fn refresh_deadline(&self) -> Option<Timestamp> {
        self.scheduler.deadline()
    }

    /// The render target for the status indicator became available or went away
    pub fn attach_status_indicator(&mut self, attached: bool) {
        debug!(" Status indicator attached: {}", attached);
        self.state.indicator_attached = attached;
    }

    pub fn jump_to_now(&mut self) {
        self.state.calculator.jump_to_now();
        self.state.recompute();
    }

    /// Advance to the next zoom level and return it
    pub fn cycle_zoom(&mut self) -> ZoomLevel {
        let zoom = self.state.prefs.zoom.next();
        self.state.prefs.zoom = zoom;
        self.state.recompute();
        info!(" Chart zoom set to {} hours", zoom.hours());
        zoom
    }

    /// React to preferences changed by another component
    pub fn set_preferences(&mut self, prefs: Preferences) {
        if self.state.prefs != prefs {
            self.state.prefs = prefs;
            self.state.recompute();
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.state.prefs
    }

    pub fn display_window(&self) -> DisplayWindow {
        self.state.window
    }

    pub fn headline(&self) -> &Headline {
        &self.state.headline
    }

    pub fn is_panned(&self) -> bool {
        self.state.calculator.is_panned()
    }

    /// Samples positioned within the chart area
    pub fn plot_points(&self) -> Vec<PlotPoint> {
        let viewport = self.state.viewport();
        let radius = self.state.prefs.zoom.point_radius();
        chart_samples(&self.state.samples)
            .iter()
            .filter_map(|sample| {
                viewport
                    .data_to_screen(sample.timestamp, sample.value)
                    .map(|position| PlotPoint {
                        position,
                        color: GlucoseBand::assess(sample.value, sample.is_estimate).color(),
                        radius,
                    })
            })
            .collect()
    }
}

impl Page for StatusPage<'_> {
    fn id(&self) -> PageId {
        PageId::Status
    }

    fn title(&self) -> &str {
        "Status"
    }

    fn handle_touch(&mut self, event: TouchEvent) -> Option<Action> {
        let state = &mut self.state;
        if !state.chart_bounds.contains(event.point().to_point()) {
            return None;
        }

        match event {
            TouchEvent::Press(point) => {
                state.last_touch = Some(point);
                None
            }
            TouchEvent::Drag(point) => {
                if let Some(last) = state.last_touch {
                    // Dragging right reveals older samples
                    let dx = point.x as i32 - last.x as i32;
                    let offset = state.viewport().pixels_to_duration(dx);
                    state.calculator.pan_by(-offset);
                    state.recompute();
                }
                state.last_touch = Some(point);
                None
            }
            TouchEvent::Release(_) => {
                state.last_touch = None;
                None
            }
            TouchEvent::LongPress(_) => {
                state.last_touch = None;
                Some(Action::CycleZoom)
            }
        }
    }

    fn update(&mut self, now: Timestamp) {
        self.state.now = now;
    }

    fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    fn mark_clean(&mut self) {
        self.state.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HOUR_MS;
    use crate::pages::status::TrendGlyph;
    use crate::storage::TrendCode;

    const T: Timestamp = 1_700_000_000_000;

    fn page<'s>() -> StatusPage<'s> {
        StatusPage::with_chart_bounds(
            Rectangle::new(Point::new(0, 0), Size::new(300, 200)),
            Preferences::default(),
        )
    }

    #[test]
    fn test_start_loads_existing_samples() {
        let store = Store::new();
        store.samples.insert(Sample::new(T - 10 * MINUTE_MS, 120)).unwrap();
        store.samples.insert(Sample::new(T - 5 * MINUTE_MS, 0)).unwrap();
        store
            .samples
            .insert(Sample::new(T - 2 * MINUTE_MS, 150).with_trend(TrendCode::SingleUp))
            .unwrap();

        let mut page = page();
        page.start(&store, T);

        let headline = page.headline();
        assert_eq!(headline.value, Some(150));
        assert_eq!(headline.trend.glyph, TrendGlyph::UpArrow);
        assert_eq!(headline.age, ReadingAge::Minutes(2));
        assert_eq!(page.display_window().max_x, T - 2 * MINUTE_MS + 90_000);
        assert_eq!(page.plot_points().len(), 2);
        assert_eq!(page.refresh_deadline(), Some(T));
    }

    #[test]
    fn test_new_sample_refreshes_and_restarts_timer() {
        let store = Store::new();
        let mut page = page();
        page.start(&store, T);
        page.attach_status_indicator(true);
        assert!(page.poll_refresh(T).is_some());
        assert_eq!(page.refresh_deadline(), Some(T + 60_000));

        store.samples.insert(Sample::new(T + 1_000, 95)).unwrap();
        assert!(page.on_store_changed(T + 2_000));
        assert_eq!(page.headline().value, Some(95));
        assert_eq!(page.refresh_deadline(), Some(T + 2_000));

        assert_eq!(
            page.poll_refresh(T + 2_000),
            Some(Duration::from_millis(59_000))
        );
    }

    #[test]
    fn test_placeholder_sample_does_not_refresh() {
        let store = Store::new();
        let mut page = page();
        page.start(&store, T);

        store.samples.insert(Sample::new(T, 0)).unwrap();
        assert!(!page.on_store_changed(T));
        assert_eq!(page.headline().value, None);
    }

    #[test]
    fn test_pump_status_must_be_recent() {
        let store = Store::new();
        let mut page = page();
        page.start(&store, T);
        page.attach_status_indicator(true);

        store
            .pump
            .insert(PumpStatus {
                timestamp: T - 10 * MINUTE_MS,
                active_insulin: 1.5,
                battery_percent: Some(50),
            })
            .unwrap();
        assert!(page.on_store_changed(T));
        assert_eq!(page.headline().active_insulin, 1.5);
        assert_eq!(page.headline().battery, BatteryLevel::Half);

        // The scheduler ages the status out
        page.poll_refresh(T);
        page.scheduler.start(T + HOUR_MS);
        page.poll_refresh(T + HOUR_MS);
        assert_eq!(page.headline().active_insulin, 0.0);
        assert_eq!(page.headline().battery, BatteryLevel::Unknown);
    }

    #[test]
    fn test_age_advances_before_indicator_attaches() {
        let store = Store::new();
        store.samples.insert(Sample::new(T - 2 * MINUTE_MS, 150)).unwrap();
        store
            .pump
            .insert(PumpStatus {
                timestamp: T - 10 * MINUTE_MS,
                active_insulin: 1.5,
                battery_percent: Some(50),
            })
            .unwrap();
        let mut page = page();
        page.start(&store, T);

        assert_eq!(page.poll_refresh(T), Some(Duration::from_millis(100)));
        assert_eq!(page.headline().age, ReadingAge::Minutes(2));

        page.poll_refresh(T + HOUR_MS);
        assert_eq!(page.headline().age, ReadingAge::Minutes(62));
        // Indicator readouts wait for the indicator
        assert_eq!(page.headline().active_insulin, 1.5);

        page.attach_status_indicator(true);
        page.poll_refresh(T + HOUR_MS + 100);
        assert_eq!(page.headline().active_insulin, 0.0);
    }

    #[test]
    fn test_long_press_requests_zoom_cycle() {
        let store = Store::new();
        store.samples.insert(Sample::new(T, 150)).unwrap();
        let mut page = page();
        page.start(&store, T);

        let action = page.handle_touch(TouchEvent::LongPress(TouchPoint::new(10, 10)));
        assert_eq!(action, Some(Action::CycleZoom));
        assert_eq!(page.cycle_zoom(), ZoomLevel::SixHours);
        assert_eq!(page.display_window().zoom, ZoomLevel::SixHours);

        let outside = page.handle_touch(TouchEvent::LongPress(TouchPoint::new(10, 250)));
        assert_eq!(outside, None);
    }

    #[test]
    fn test_drag_pans_and_jump_to_now_resets() {
        let store = Store::new();
        store.samples.insert(Sample::new(T, 150)).unwrap();
        let mut page = page();
        page.start(&store, T);
        let live = page.display_window();

        page.handle_touch(TouchEvent::Press(TouchPoint::new(100, 50)));
        page.handle_touch(TouchEvent::Drag(TouchPoint::new(160, 50)));
        page.handle_touch(TouchEvent::Release(TouchPoint::new(160, 50)));
        assert!(page.is_panned());
        assert!(page.display_window().max_x < live.max_x);

        page.jump_to_now();
        assert!(!page.is_panned());
        assert_eq!(page.display_window(), live);
    }

    #[test]
    fn test_stop_cancels_timer_and_feeds() {
        let store = Store::new();
        let mut page = page();
        page.start(&store, T);
        page.stop();

        assert!(!page.is_started());
        assert_eq!(page.refresh_deadline(), None);
        store.samples.insert(Sample::new(T, 150)).unwrap();
        assert!(!page.on_store_changed(T));
        assert_eq!(page.headline().value, None);
    }

    #[test]
    fn test_unavailable_store_shows_empty_window() {
        let store = Store::new();
        store.samples.close();
        let mut page = page();
        page.start(&store, T);

        let window = page.display_window();
        assert_eq!((window.min_x, window.max_x), (T - 3 * HOUR_MS, T));
        assert_eq!((window.min_y, window.max_y), (80, 120));
    }
}
