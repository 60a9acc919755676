//! User log write path
//!
//! Producers anywhere in the application describe log writes to a
//! [`LogPublisher`], which stamps them and enqueues them without blocking.
//! A single [`LogWriter`] applies the queued writes to the log table in
//! order. Each append also evicts entries older than the retention horizon,
//! in the same commit, so the table never holds stale rows after a write.
//!
//! Writes are fire-and-forget. When the queue is saturated the write is
//! dropped and logged; the caller is never told.

use alloc::string::ToString;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, error, warn};

use super::{Clock, LogCategory, LogEntry, LogVisibility, Table, Timestamp};
use crate::app_state::AppError;
use crate::config::HOUR_MS;

/// Entries older than this, relative to the newest write, are deleted
pub const RETENTION_MS: i64 = 72 * HOUR_MS;

/// Capacity of the write queue between publishers and the writer
pub const WRITE_QUEUE_DEPTH: usize = 32;

/// A log write waiting to be applied
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert the entry and evict everything older than the retention horizon
    Append(LogEntry),
    /// Delete every entry
    Clear,
    /// Evict entries older than the retention horizon relative to `now`
    EvictStale { now: Timestamp },
}

pub type WriteQueue = Channel<CriticalSectionRawMutex, WriteOp, WRITE_QUEUE_DEPTH>;

/// Whether an entry at `timestamp` is still retained at `now`
pub const fn is_retained(timestamp: Timestamp, now: Timestamp) -> bool {
    timestamp >= now - RETENTION_MS
}

/// Cheap handle for emitting log entries
pub struct LogPublisher<'a, C: Clock> {
    queue: &'a WriteQueue,
    clock: C,
}

impl<'a, C: Clock> LogPublisher<'a, C> {
    pub fn new(queue: &'a WriteQueue, clock: C) -> Self {
        Self { queue, clock }
    }

    /// Record a log entry stamped with the current time
    pub fn append(&self, category: LogCategory, visibility: LogVisibility, text: &str) {
        let entry = LogEntry {
            timestamp: self.clock.now(),
            text: text.to_string(),
            category,
            visibility,
        };
        self.enqueue(WriteOp::Append(entry));
    }

    /// Record an informational entry shown in both log modes
    pub fn add(&self, text: &str) {
        self.append(LogCategory::Info, LogVisibility::NotApplicable, text);
    }

    /// Delete every log entry
    pub fn clear(&self) {
        self.enqueue(WriteOp::Clear);
    }

    /// Delete entries that have aged past the retention horizon
    pub fn evict_stale(&self) {
        self.enqueue(WriteOp::EvictStale {
            now: self.clock.now(),
        });
    }

    fn enqueue(&self, op: WriteOp) {
        if self.queue.try_send(op).is_err() {
            warn!(" Log write queue full, dropping write");
        }
    }
}

/// Applies queued log writes to the log table
///
/// Retention is measured against the writer's clock when a write is applied,
/// not when it was enqueued.
pub struct LogWriter<'a, C: Clock> {
    queue: &'a WriteQueue,
    table: &'a Table<LogEntry>,
    clock: C,
}

impl<'a, C: Clock> LogWriter<'a, C> {
    pub fn new(queue: &'a WriteQueue, table: &'a Table<LogEntry>, clock: C) -> Self {
        Self {
            queue,
            table,
            clock,
        }
    }

    /// Apply writes as they arrive, forever
    pub async fn run(&self) {
        loop {
            let op = self.queue.receive().await;
            self.apply(op);
        }
    }

    /// Apply every write currently queued; returns the number applied
    pub fn drain(&self) -> usize {
        let mut applied = 0;
        while let Ok(op) = self.queue.try_receive() {
            self.apply(op);
            applied += 1;
        }
        applied
    }

    fn apply(&self, op: WriteOp) {
        if let Err(e) = self.try_apply(op) {
            error!(" Dropping log write: {}", e);
        }
    }

    fn try_apply(&self, op: WriteOp) -> Result<(), AppError> {
        match op {
            WriteOp::Append(entry) => {
                let now = self.clock.now();
                let evicted = self.table.mutate(|tx| {
                    tx.insert(entry);
                    tx.retain(|existing| is_retained(existing.timestamp, now))
                })?;
                if evicted > 0 {
                    debug!(" Evicted {} stale log entries", evicted);
                }
            }
            WriteOp::Clear => {
                let removed = self.table.clear()?;
                debug!(" Cleared {} log entries", removed);
            }
            WriteOp::EvictStale { now } => {
                let evicted = self
                    .table
                    .retain(|existing| is_retained(existing.timestamp, now))?;
                debug!(" Evicted {} stale log entries", evicted);
            }
        }
        Ok(())
    }
}
