//! Display manager: the single UI task
//!
//! This module owns the status page and the log stream and is the only place
//! where they are touched:
//! - Receives touch events and commands via a channel
//! - Delivers store changes to the live queries when the store signals
//! - Fires the refresh scheduler and advances scroll animations on a timer
//! - Queues notices (zoom changes, control visibility) for the collaborator

use embassy_futures::select::{Either3, select3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Duration, Timer};
use heapless::Deque;
use log::{debug, info, warn};

use crate::app_state::AppRunState;
use crate::config::{Preferences, ZoomLevel};
use crate::pages::log::LogView;
use crate::pages::status::{DisplayWindow, Headline};
use crate::pages::{LogStream, Page, StatusPage};
use crate::storage::log_publisher::{LogPublisher, WriteQueue};
use crate::storage::{Clock, Store, Timestamp};
use crate::ui::{Action, TouchEvent};

/// Channel capacity for display requests
pub const DISPLAY_REQUEST_CAPACITY: usize = 8;

/// Notices kept for the collaborator before the oldest is dropped
const NOTICE_CAPACITY: usize = 8;

/// Frame interval while a scroll animation runs
const FRAME_INTERVAL_MS: u64 = 16;

/// Longest sleep of the UI loop
const IDLE_INTERVAL_MS: u64 = 1_000;

/// Request delivered to the UI task
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayRequest {
    /// Touch on the status page
    StatusTouch(TouchEvent),
    /// Touch on the log view
    LogTouch(TouchEvent),
    /// Command from a button or another component
    Action(Action),
    /// Preferences changed elsewhere
    SetPreferences(Preferences),
    /// The status indicator render target appeared or went away
    AttachStatusIndicator(bool),
    /// Views became visible
    Start,
    /// Views were hidden
    Stop,
}

/// Outgoing notice for the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Zoom was cycled and should be persisted
    ZoomChanged(ZoomLevel),
    /// The floating log controls were shown or hidden
    LogControls(bool),
}

pub type DisplayChannel =
    Channel<CriticalSectionRawMutex, DisplayRequest, DISPLAY_REQUEST_CAPACITY>;
pub type DisplaySender<'a> =
    Sender<'a, CriticalSectionRawMutex, DisplayRequest, DISPLAY_REQUEST_CAPACITY>;
pub type DisplayReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, DisplayRequest, DISPLAY_REQUEST_CAPACITY>;

/// Global channel for display requests
pub static DISPLAY_CHANNEL: DisplayChannel = Channel::new();

/// Owns the views and drives them from requests, store changes and timers
pub struct DisplayManager<'s, C: Clock> {
    store: &'s Store,
    /// Store handle held while running
    session: Option<&'s Store>,
    clock: &'s C,
    publisher: LogPublisher<'s, &'s C>,
    status: StatusPage<'s>,
    log: LogStream<'s>,
    run_state: AppRunState,
    notices: Deque<Notice, NOTICE_CAPACITY>,
    log_controls: bool,
}

impl<'s, C: Clock> DisplayManager<'s, C> {
    pub fn new(
        store: &'s Store,
        log_queue: &'s WriteQueue,
        clock: &'s C,
        prefs: Preferences,
    ) -> Self {
        Self {
            store,
            session: None,
            clock,
            publisher: LogPublisher::new(log_queue, clock),
            status: StatusPage::new(prefs),
            log: LogStream::new(),
            run_state: AppRunState::Stopped,
            notices: Deque::new(),
            log_controls: false,
        }
    }

    /// Acquire the store, subscribe both views and start the refresh timer
    pub fn start(&mut self) {
        if self.run_state == AppRunState::Running {
            return;
        }
        let now = self.clock.now();
        let store = self.store;
        self.session = Some(store);

        self.status.start(store, now);
        let extended = self.status.preferences().extended_log;
        self.log.start(&store.log, &self.publisher, extended);
        self.sync_log_controls();

        self.run_state = AppRunState::Running;
        info!(" Display manager started");
    }

    /// Tear down in reverse order of `start`
    pub fn stop(&mut self) {
        if self.run_state == AppRunState::Stopped {
            return;
        }
        self.status.cancel_refresh();
        self.status.unsubscribe();
        self.log.stop();
        self.sync_log_controls();
        self.session = None;

        self.run_state = AppRunState::Stopped;
        info!(" Display manager stopped");
    }

    pub fn run_state(&self) -> AppRunState {
        self.run_state
    }

    /// Whether the store handle is currently held
    pub fn holds_store(&self) -> bool {
        self.session.is_some()
    }

    /// Process a display request
    pub fn process_request(&mut self, request: DisplayRequest) {
        debug!(" Processing request: {:?}", request);
        match request {
            DisplayRequest::StatusTouch(event) => {
                if let Some(action) = self.status.handle_touch(event) {
                    self.handle_action(action);
                }
            }
            DisplayRequest::LogTouch(event) => {
                if let Some(action) = self.log.handle_touch(event) {
                    self.handle_action(action);
                }
                self.sync_log_controls();
            }
            DisplayRequest::Action(action) => self.handle_action(action),
            DisplayRequest::SetPreferences(prefs) => self.set_preferences(prefs),
            DisplayRequest::AttachStatusIndicator(attached) => {
                self.status.attach_status_indicator(attached)
            }
            DisplayRequest::Start => self.start(),
            DisplayRequest::Stop => self.stop(),
        }
    }

    fn handle_action(&mut self, action: Action) {
        debug!(" Handling action: {:?}", action);
        match action {
            Action::CycleZoom => {
                let zoom = self.status.cycle_zoom();
                self.push_notice(Notice::ZoomChanged(zoom));
            }
            Action::JumpToNow => self.status.jump_to_now(),
            Action::FocusCurrentLog => {
                self.log.focus_current_tap();
            }
            Action::SearchLog => {
                self.log.search();
            }
            Action::SearchLogSessions => {
                self.log.search_sessions();
            }
        }
        self.sync_log_controls();
    }

    fn set_preferences(&mut self, prefs: Preferences) {
        let mode_changed = self.status.preferences().extended_log != prefs.extended_log;
        self.status.set_preferences(prefs);

        if let (true, Some(store)) = (mode_changed, self.session) {
            self.log.start(&store.log, &self.publisher, prefs.extended_log);
            self.sync_log_controls();
        }
    }

    /// Deliver pending store changes to both views
    pub fn on_store_changed(&mut self) -> bool {
        let now = self.clock.now();
        let status = self.status.on_store_changed(now);
        let log = self.log.on_store_changed();
        self.sync_log_controls();
        status || log
    }

    /// Timer work: scheduler firing and one animation frame
    pub fn tick(&mut self) {
        let now = self.clock.now();
        if let Some(delay) = self.status.poll_refresh(now) {
            debug!(" Refresh fired, next in {} ms", delay.as_millis());
        }
        self.status.update(now);
        self.log.update(now);
        self.sync_log_controls();
    }

    /// How long the UI loop may sleep before `tick` has work to do
    pub fn next_wakeup(&self, now: Timestamp) -> Duration {
        let idle = Duration::from_millis(IDLE_INTERVAL_MS);
        if self.run_state == AppRunState::Stopped {
            return idle;
        }
        if self.log.view().scroll().is_animating() {
            return Duration::from_millis(FRAME_INTERVAL_MS);
        }
        match self.status.refresh_deadline() {
            Some(deadline) => Duration::from_millis((deadline - now).max(0) as u64).min(idle),
            None => idle,
        }
    }

    fn sync_log_controls(&mut self) {
        let visible = self.log.view().controls_visible();
        if visible != self.log_controls {
            self.log_controls = visible;
            self.push_notice(Notice::LogControls(visible));
        }
    }

    fn push_notice(&mut self, notice: Notice) {
        if self.notices.is_full() {
            warn!(" Notice queue full, dropping oldest");
            self.notices.pop_front();
        }
        let _ = self.notices.push_back(notice);
    }

    /// Take the oldest pending notice
    pub fn pop_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    pub fn display_window(&self) -> DisplayWindow {
        self.status.display_window()
    }

    pub fn headline(&self) -> &Headline {
        self.status.headline()
    }

    pub fn log_view(&self) -> &LogView {
        self.log.view()
    }

    pub fn status_page(&self) -> &StatusPage<'s> {
        &self.status
    }

    /// Run the display manager task
    ///
    /// Waits for the first of a request, a store change or the timer, handles
    /// it, and repeats.
    pub async fn run(&mut self, receiver: DisplayReceiver<'_>) {
        info!(" Display manager task started");

        loop {
            let wait = self.next_wakeup(self.clock.now());
            match select3(
                receiver.receive(),
                self.store.changed().wait(),
                Timer::after(wait),
            )
            .await
            {
                Either3::First(request) => self.process_request(request),
                Either3::Second(()) => {
                    self.on_store_changed();
                }
                Either3::Third(()) => self.tick(),
            }
        }
    }
}

/// Helper to get a display request sender
pub fn get_display_sender() -> DisplaySender<'static> {
    DISPLAY_CHANNEL.sender()
}

/// Helper to get a display request receiver
pub fn get_display_receiver() -> DisplayReceiver<'static> {
    DISPLAY_CHANNEL.receiver()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlucoseUnit;
    use crate::pages::log::ScrollMode;
    use crate::storage::log_publisher::{LogWriter, WRITE_QUEUE_DEPTH};
    use crate::storage::{LogCategory, LogVisibility, Sample};
    use crate::ui::TouchPoint;
    use core::cell::Cell;
    use embassy_futures::block_on;
    use embassy_futures::select::select;

    const T: Timestamp = 1_700_000_000_000;

    struct TestClock(Cell<Timestamp>);

    impl TestClock {
        fn advance(&self, ms: i64) {
            self.0.set(self.0.get() + ms);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Timestamp {
            self.0.get()
        }
    }

    /// Publish `count` lines, draining before the write queue can fill
    fn log_lines(store: &Store, queue: &WriteQueue, clock: &TestClock, count: usize) {
        let publisher = LogPublisher::new(queue, clock);
        let writer = LogWriter::new(queue, &store.log, clock);
        for i in 0..count {
            publisher.add("Uploaded sample");
            if (i + 1) % (WRITE_QUEUE_DEPTH / 2) == 0 {
                writer.drain();
            }
        }
        writer.drain();
    }

    #[test]
    fn test_start_and_stop_lifecycle() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());

        manager.process_request(DisplayRequest::Start);
        assert_eq!(manager.run_state(), AppRunState::Running);
        assert!(manager.holds_store());
        assert!(manager.status_page().refresh_deadline().is_some());

        manager.process_request(DisplayRequest::Stop);
        assert_eq!(manager.run_state(), AppRunState::Stopped);
        assert!(!manager.holds_store());
        assert_eq!(manager.status_page().refresh_deadline(), None);
        assert!(!manager.status_page().is_started());

        store.samples.insert(Sample::new(T, 120)).unwrap();
        assert!(!manager.on_store_changed());
        assert_eq!(manager.headline().value, None);
    }

    #[test]
    fn test_store_change_updates_headline() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());
        manager.start();

        store.samples.insert(Sample::new(T, 150)).unwrap();
        assert!(manager.on_store_changed());
        assert_eq!(manager.headline().value, Some(150));
        assert!(manager.display_window().contains(&Sample::new(T, 150)));
    }

    #[test]
    fn test_cycle_zoom_queues_notice() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());
        manager.start();

        manager.process_request(DisplayRequest::Action(Action::CycleZoom));
        assert_eq!(manager.pop_notice(), Some(Notice::ZoomChanged(ZoomLevel::SixHours)));
        assert_eq!(manager.pop_notice(), None);
    }

    #[test]
    fn test_refresh_fires_when_indicator_attached() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        store.samples.insert(Sample::new(T - 30_000, 110)).unwrap();
        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());
        manager.process_request(DisplayRequest::AttachStatusIndicator(true));
        manager.start();

        manager.tick();
        // Next firing on the minute boundary after the sample
        assert_eq!(manager.status_page().refresh_deadline(), Some(T + 30_000));
        assert_eq!(manager.next_wakeup(T), Duration::from_millis(IDLE_INTERVAL_MS));

        clock.advance(30_000);
        manager.tick();
        assert_eq!(manager.status_page().refresh_deadline(), Some(T + 90_000));
    }

    #[test]
    fn test_log_follows_and_reports_controls() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());
        manager.start();
        // Eviction requested by the log stream on start
        LogWriter::new(&queue, &store.log, &clock).drain();

        log_lines(&store, &queue, &clock, 60);
        manager.on_store_changed();
        assert_eq!(manager.log_view().rows().len(), 60);
        assert_eq!(
            manager.log_view().last_command().map(|c| c.mode),
            Some(ScrollMode::Jump)
        );
        assert_eq!(manager.pop_notice(), None);

        // Dragging down scrolls towards older entries
        manager.process_request(DisplayRequest::LogTouch(TouchEvent::Press(TouchPoint::new(
            100, 10,
        ))));
        manager.process_request(DisplayRequest::LogTouch(TouchEvent::Drag(TouchPoint::new(
            100, 230,
        ))));
        assert!(!manager.log_view().auto_scroll());
        assert_eq!(manager.pop_notice(), Some(Notice::LogControls(true)));

        manager.process_request(DisplayRequest::Action(Action::FocusCurrentLog));
        while manager.log_view().scroll().is_animating() {
            manager.tick();
        }
        assert_eq!(manager.log_view().scroll().remaining(), 0);
        assert_eq!(manager.pop_notice(), Some(Notice::LogControls(false)));
    }

    #[test]
    fn test_extended_log_preference_restarts_stream() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        let publisher = LogPublisher::new(&queue, &clock);
        publisher.append(LogCategory::Info, LogVisibility::Extended, "Radio debug");
        publisher.append(LogCategory::Info, LogVisibility::Normal, "Sensor warm up");
        LogWriter::new(&queue, &store.log, &clock).drain();

        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());
        manager.start();
        assert_eq!(manager.log_view().rows()[0].value.text, "Sensor warm up");

        let prefs = Preferences {
            extended_log: true,
            unit: GlucoseUnit::Mmol,
            ..Preferences::default()
        };
        manager.process_request(DisplayRequest::SetPreferences(prefs));
        assert!(manager.log_view().is_extended());
        assert_eq!(manager.log_view().rows()[0].value.text, "Radio debug");
        assert_eq!(manager.display_window().unit, GlucoseUnit::Mmol);
    }

    #[test]
    fn test_run_handles_requests_and_store_changes() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        let channel = DisplayChannel::new();
        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());

        channel.try_send(DisplayRequest::Start).unwrap();
        channel
            .try_send(DisplayRequest::Action(Action::CycleZoom))
            .unwrap();
        store.samples.insert(Sample::new(T, 130)).unwrap();

        block_on(select(
            manager.run(channel.receiver()),
            Timer::after(Duration::from_millis(50)),
        ));

        assert_eq!(manager.run_state(), AppRunState::Running);
        assert_eq!(manager.headline().value, Some(130));
        assert_eq!(manager.display_window().zoom, ZoomLevel::SixHours);
    }

    #[test]
    fn test_wakeup_while_stopped_and_animating() {
        let store = Store::new();
        let queue = WriteQueue::new();
        let clock = TestClock(Cell::new(T));
        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());
        assert_eq!(manager.next_wakeup(T), Duration::from_millis(IDLE_INTERVAL_MS));

        log_lines(&store, &queue, &clock, 30);
        manager.start();
        // Refresh is due immediately after start
        assert_eq!(manager.next_wakeup(T), Duration::from_millis(0));

        log_lines(&store, &queue, &clock, 1);
        manager.on_store_changed();
        assert!(manager.log_view().scroll().is_animating());
        assert_eq!(manager.next_wakeup(T), Duration::from_millis(FRAME_INTERVAL_MS));
    }
}
