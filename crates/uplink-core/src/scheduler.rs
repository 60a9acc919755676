//! Recency-aligned refresh of the "minutes since last reading" indicator
//!
//! The scheduler is a cancelable repeating task driven by the UI loop: the
//! loop sleeps until [`RefreshScheduler::deadline`] and then calls
//! [`RefreshScheduler::fire`]. Each firing refreshes the reading age, refreshes
//! the status indicator once it is attached, and reschedules itself so that the next firing lands exactly on a whole-minute
//! boundary after the latest sample, which is when the displayed age changes.

use embassy_time::Duration;
use log::debug;

use crate::storage::Timestamp;

/// One minute in milliseconds
pub const MINUTE_MS: i64 = 60_000;

/// Retry delay while the render target is not attached yet
pub const NOT_READY_RETRY_MS: u64 = 100;

/// Something the scheduler refreshes on every firing
pub trait RefreshTarget {
    /// Whether the status indicator exists and can be refreshed
    fn is_ready(&self) -> bool;

    /// Timestamp of the most recent sample, if any
    fn last_sample_time(&self) -> Option<Timestamp>;

    /// Recompute the reading age, on every firing
    fn refresh(&mut self, now: Timestamp);

    /// Recompute the status indicator readouts, only while ready
    fn refresh_indicator(&mut self, now: Timestamp);
}

/// Delay until the next firing
///
/// * target not ready: retry after 100 ms
/// * a sample exists: wait until the next whole minute after it
/// * otherwise: one minute
pub fn next_delay(now: Timestamp, last_sample: Option<Timestamp>, target_ready: bool) -> Duration {
    if !target_ready {
        return Duration::from_millis(NOT_READY_RETRY_MS);
    }
    match last_sample {
        Some(last) => {
            let into_minute = (now - last).rem_euclid(MINUTE_MS);
            Duration::from_millis((MINUTE_MS - into_minute) as u64)
        }
        None => Duration::from_millis(MINUTE_MS as u64),
    }
}

/// At most one pending firing at any time
#[derive(Debug, Default)]
pub struct RefreshScheduler {
    deadline: Option<Timestamp>,
}

impl RefreshScheduler {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Cancel any pending firing and schedule one immediately
    pub fn start(&mut self, now: Timestamp) {
        if self.deadline.is_some() {
            debug!(" Restarting refresh scheduler");
        }
        self.deadline = Some(now);
    }

    /// Cancel the pending firing; no further firings happen until started
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wall-clock time of the pending firing
    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Time left until the pending firing, zero if overdue
    pub fn until_deadline(&self, now: Timestamp) -> Option<Duration> {
        self.deadline
            .map(|deadline| Duration::from_millis((deadline - now).max(0) as u64))
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Run the pending firing if it is due
    ///
    /// Always refreshes the reading age and refreshes the indicator when the
    /// target is ready, then schedules the next firing.
    /// Returns the delay chosen, or `None` if nothing was due.
    pub fn fire<T: RefreshTarget>(&mut self, now: Timestamp, target: &mut T) -> Option<Duration> {
        if !self.is_due(now) {
            return None;
        }

        target.refresh(now);
        let ready = target.is_ready();
        if ready {
            target.refresh_indicator(now);
        }
        let delay = next_delay(now, target.last_sample_time(), ready);
        self.deadline = Some(now + delay.as_millis() as i64);
        Some(delay)
    }
}
