//! Headless desktop simulator for the uplink display core.
//!
//! Runs the display manager against an in-memory store fed with synthetic CGM
//! samples, pump status and log messages, and reports what the status page and
//! the log view would show through `log` (`RUST_LOG=info` or `debug`).
//!
//! Threads:
//!
//! | Thread    | Work                                              |
//! |-----------|---------------------------------------------------|
//! | producer  | writes samples and pump status, publishes log     |
//! |           | lines, sends scripted display requests            |
//! | writer    | drains the log write queue into the store         |
//! | main      | runs the display manager task                     |

use std::thread;
use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};

use embassy_futures::block_on;
use embassy_futures::select::select;
use embassy_time::{Duration, Timer};
use log::{info, warn};

use uplink_core::config::{HOUR_MS, Preferences};
use uplink_core::display_manager::{
    DisplayManager, DisplayRequest, get_display_receiver, get_display_sender,
};
use uplink_core::storage::log_publisher::{LogPublisher, LogWriter, WriteQueue};
use uplink_core::storage::{
    Clock, LogCategory, LogVisibility, PumpStatus, Sample, Store, Timestamp, TrendCode,
};
use uplink_core::ui::Action;

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// Spacing of the backfilled history, as a real sensor reports
const SENSOR_INTERVAL_MS: i64 = 5 * 60 * 1000;

/// Real time between synthetic live samples
const LIVE_SAMPLE_INTERVAL: StdDuration = StdDuration::from_secs(5);

/// Real time between log writer passes
const WRITER_INTERVAL: StdDuration = StdDuration::from_millis(50);

/// How often the simulator reports the display state
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall clock in milliseconds since the Unix epoch
struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Timestamp)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Sinusoidal glucose in mg/dL at a given time
fn glucose_at(timestamp: Timestamp) -> i32 {
    let t = timestamp as f64 / 60_000.0;
    // Slow 6 h swing with a faster wobble
    let value = 140.0 + 70.0 * (t / 57.3).sin() + 12.0 * (t / 13.0).cos();
    value.round() as i32
}

/// Trend code from the rate of change in mg/dL per minute
fn trend_for(previous: i32, current: i32, minutes: i64) -> TrendCode {
    let rate = (current - previous) as f64 / minutes.max(1) as f64;
    match rate {
        r if r >= 3.0 => TrendCode::DoubleUp,
        r if r >= 2.0 => TrendCode::SingleUp,
        r if r >= 1.0 => TrendCode::FortyFiveUp,
        r if r > -1.0 => TrendCode::Flat,
        r if r > -2.0 => TrendCode::FortyFiveDown,
        r if r > -3.0 => TrendCode::SingleDown,
        _ => TrendCode::DoubleDown,
    }
}

fn sample_at(timestamp: Timestamp, previous: Timestamp) -> Sample {
    let value = glucose_at(timestamp);
    let trend = trend_for(glucose_at(previous), value, (timestamp - previous) / 60_000);
    Sample::new(timestamp, value).with_trend(trend)
}

/// Fill the last day of sensor history so the chart has something to show
fn backfill(store: &Store, now: Timestamp) {
    let first = now - 24 * HOUR_MS;
    let written = store.samples.mutate(|tx| {
        let mut timestamp = first;
        while timestamp < now {
            tx.insert(sample_at(timestamp, timestamp - SENSOR_INTERVAL_MS));
            timestamp += SENSOR_INTERVAL_MS;
        }
        tx.len()
    });
    match written {
        Ok(count) => info!("Backfilled {} samples", count),
        Err(e) => warn!("Backfill failed: {}", e),
    }
}

/// Writes live data and drives the display like a user would
fn produce(store: &Store, queue: &WriteQueue) {
    let clock = SystemClock;
    let publisher = LogPublisher::new(queue, &clock);
    let sender = get_display_sender();

    publisher.append(
        LogCategory::Startup,
        LogVisibility::NotApplicable,
        "Uploader started",
    );

    let mut previous = clock.now() - SENSOR_INTERVAL_MS;
    for tick in 0u64.. {
        thread::sleep(LIVE_SAMPLE_INTERVAL);
        let now = clock.now();

        let sample = sample_at(now, previous);
        previous = now;
        if let Err(e) = store.samples.insert(sample) {
            warn!("Sample write failed: {}", e);
            continue;
        }
        publisher.add(&format!("Uploaded {} mg/dL", sample.value));
        publisher.append(
            LogCategory::Info,
            LogVisibility::Extended,
            &format!("Sensor packet at {}", now),
        );

        if tick % 3 == 0 {
            let status = PumpStatus {
                timestamp: now,
                active_insulin: 1.5 + (tick as f32 / 10.0).sin(),
                battery_percent: Some(75),
            };
            if let Err(e) = store.pump.insert(status) {
                warn!("Pump write failed: {}", e);
            }
        }
        if tick % 7 == 0 {
            publisher.append(
                LogCategory::Warn,
                LogVisibility::NotApplicable,
                "Pump connection lost",
            );
        }

        // Scripted input
        let request = match tick % 12 {
            4 => Some(DisplayRequest::Action(Action::CycleZoom)),
            6 => Some(DisplayRequest::Action(Action::SearchLog)),
            8 => Some(DisplayRequest::Action(Action::FocusCurrentLog)),
            10 => Some(DisplayRequest::Action(Action::JumpToNow)),
            _ => None,
        };
        if let Some(request) = request {
            if sender.try_send(request).is_err() {
                warn!("Display request queue full, dropping {:?}", request);
            }
        }
    }
}

/// Applies queued log writes until the process exits
fn write_log(store: &Store, queue: &WriteQueue) {
    let writer = LogWriter::new(queue, &store.log, SystemClock);
    loop {
        writer.drain();
        thread::sleep(WRITER_INTERVAL);
    }
}

fn report(manager: &mut DisplayManager<'_, SystemClock>) {
    let window = manager.display_window();
    let headline = manager.headline();
    info!(
        "Chart {} h, y {}..{} mg/dL ({}) | latest {:?} {:?} estimate={} age {:?} | IOB {:.2} U battery {}",
        window.zoom.hours(),
        window.min_y,
        window.max_y,
        headline.unit.label(),
        headline.value,
        headline.trend.glyph,
        headline.is_estimate,
        headline.age,
        headline.active_insulin,
        headline.battery.label(),
    );

    let view = manager.log_view();
    info!(
        "Log {} rows, showing {:?}, auto-scroll {}, controls {}",
        view.rows().len(),
        view.scroll().visible_rows(),
        view.auto_scroll(),
        view.controls_visible(),
    );
    if let Some(row) = view.visible_entries().last() {
        info!("Log tail: [{:?}] {}", row.value.category, row.value.text);
    }

    while let Some(notice) = manager.pop_notice() {
        info!("Notice: {:?}", notice);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting uplink simulator");

    let clock = SystemClock;
    let store = Store::new();
    let queue = WriteQueue::new();
    backfill(&store, clock.now());

    thread::scope(|scope| {
        scope.spawn(|| write_log(&store, &queue));
        scope.spawn(|| produce(&store, &queue));

        let mut manager = DisplayManager::new(&store, &queue, &clock, Preferences::default());
        let sender = get_display_sender();
        for request in [DisplayRequest::AttachStatusIndicator(true), DisplayRequest::Start] {
            if sender.try_send(request).is_err() {
                warn!("Display request queue full, dropping {:?}", request);
            }
        }

        loop {
            block_on(select(
                manager.run(get_display_receiver()),
                Timer::after(REPORT_INTERVAL),
            ));
            report(&mut manager);
        }
    });
}
