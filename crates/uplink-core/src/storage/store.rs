//! In-memory store for samples, pump status and log entries.
//!
//! The persistence engine is an external collaborator; this store implements
//! the contract the display core consumes from it: ordered, filtered queries
//! over each collection, atomic multi-row commits, and a change signal raised
//! on every committed mutation so the UI task knows when to re-run its live
//! queries.
//!
//! Every row carries a stable [`RowId`] and a per-row revision. Live queries
//! diff their snapshots by those two values, see
//! [`ChangeFeed`](crate::change_feed::ChangeFeed).

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::debug;

use super::{LogEntry, PumpStatus, Record, Sample, Timestamp};
use crate::app_state::AppError;

/// Stable identity of a stored row
pub type RowId = u64;

/// Raised after every committed mutation of any table in a [`Store`]
pub type ChangeSignal = Signal<CriticalSectionRawMutex, ()>;

/// A stored record together with its identity and revision
#[derive(Debug, Clone, PartialEq)]
pub struct Row<T> {
    pub id: RowId,
    /// Bumped every time the row is updated in place
    pub revision: u32,
    pub value: T,
}

/// Filter over one table; results are always ordered by ascending timestamp
pub struct Query<T> {
    predicates: Vec<Box<dyn Fn(&T) -> bool>>,
}

impl<T: Record> Query<T> {
    /// Match every row
    pub fn all() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Add a predicate; all predicates must hold for a row to match
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Only rows strictly newer than `timestamp`
    pub fn since(self, timestamp: Timestamp) -> Self {
        self.filter(move |record| record.timestamp() > timestamp)
    }

    pub fn matches(&self, record: &T) -> bool {
        self.predicates.iter().all(|predicate| predicate(record))
    }
}

impl<T: Record> Default for Query<T> {
    fn default() -> Self {
        Self::all()
    }
}

struct TableState<T> {
    rows: Vec<Row<T>>,
    next_id: RowId,
    open: bool,
}

/// Mutable access to a table for the duration of one commit
pub struct TableTx<'t, T> {
    state: &'t mut TableState<T>,
    changed: bool,
}

impl<T: Record> TableTx<'_, T> {
    /// Insert a new row and return its id
    pub fn insert(&mut self, value: T) -> RowId {
        let id = self.state.next_id;
        self.state.next_id += 1;
        self.state.rows.push(Row {
            id,
            revision: 0,
            value,
        });
        self.changed = true;
        id
    }

    /// Update a row in place, bumping its revision
    pub fn update<F>(&mut self, id: RowId, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut T),
    {
        let row = self
            .state
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(AppError::UnknownRow(id))?;
        f(&mut row.value);
        row.revision = row.revision.wrapping_add(1);
        self.changed = true;
        Ok(())
    }

    /// Keep only the rows matching `keep`; returns the number of rows removed
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.state.rows.len();
        self.state.rows.retain(|row| keep(&row.value));
        let removed = before - self.state.rows.len();
        if removed > 0 {
            self.changed = true;
        }
        removed
    }

    /// Remove every row; returns the number of rows removed
    pub fn clear(&mut self) -> usize {
        self.retain(|_| false)
    }

    pub fn len(&self) -> usize {
        self.state.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.rows.is_empty()
    }
}

/// One collection of records
pub struct Table<T> {
    name: &'static str,
    state: Mutex<CriticalSectionRawMutex, RefCell<TableState<T>>>,
    changed: Arc<ChangeSignal>,
}

impl<T: Record> Table<T> {
    fn new(name: &'static str, changed: Arc<ChangeSignal>) -> Self {
        Self {
            name,
            state: Mutex::new(RefCell::new(TableState {
                rows: Vec::new(),
                next_id: 1,
                open: true,
            })),
            changed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run several mutations as one commit
    ///
    /// The change signal is raised once, after the commit, and only if a row
    /// was actually touched.
    pub fn mutate<R, F>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut TableTx<'_, T>) -> R,
    {
        let (result, changed) = self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if !state.open {
                return Err(AppError::StoreUnavailable(self.name));
            }
            let mut tx = TableTx {
                state: &mut state,
                changed: false,
            };
            let result = f(&mut tx);
            Ok((result, tx.changed))
        })?;

        if changed {
            self.changed.signal(());
        }
        Ok(result)
    }

    pub fn insert(&self, value: T) -> Result<RowId, AppError> {
        self.mutate(|tx| tx.insert(value))
    }

    pub fn update<F>(&self, id: RowId, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut T),
    {
        self.mutate(|tx| tx.update(id, f))?
    }

    pub fn retain<F>(&self, keep: F) -> Result<usize, AppError>
    where
        F: FnMut(&T) -> bool,
    {
        self.mutate(|tx| tx.retain(keep))
    }

    pub fn clear(&self) -> Result<usize, AppError> {
        self.mutate(|tx| tx.clear())
    }

    /// Run a query and return the matching rows ordered by timestamp
    ///
    /// Rows with equal timestamps keep insertion order.
    pub fn query(&self, query: &Query<T>) -> Result<Vec<Row<T>>, AppError> {
        self.state.lock(|cell| {
            let state = cell.borrow();
            if !state.open {
                return Err(AppError::StoreUnavailable(self.name));
            }
            let mut rows: Vec<Row<T>> = state
                .rows
                .iter()
                .filter(|row| query.matches(&row.value))
                .cloned()
                .collect();
            rows.sort_by_key(|row| (row.value.timestamp(), row.id));
            Ok(rows)
        })
    }

    pub fn len(&self) -> usize {
        self.state.lock(|cell| cell.borrow().rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_open(&self) -> bool {
        self.state.lock(|cell| cell.borrow().open)
    }

    /// Make the table unavailable; queries and writes fail until reopened
    pub fn close(&self) {
        debug!(" Closing table {}", self.name);
        self.state.lock(|cell| cell.borrow_mut().open = false);
        self.changed.signal(());
    }

    pub fn reopen(&self) {
        debug!(" Reopening table {}", self.name);
        self.state.lock(|cell| cell.borrow_mut().open = true);
        self.changed.signal(());
    }
}

/// The collections the display core observes
pub struct Store {
    /// CGM sensor glucose samples
    pub samples: Table<Sample>,
    /// Pump status snapshots
    pub pump: Table<PumpStatus>,
    /// User log entries
    pub log: Table<LogEntry>,
    changed: Arc<ChangeSignal>,
}

impl Store {
    pub fn new() -> Self {
        let changed = Arc::new(ChangeSignal::new());
        Self {
            samples: Table::new("samples", changed.clone()),
            pump: Table::new("pump", changed.clone()),
            log: Table::new("log", changed.clone()),
            changed,
        }
    }

    /// Signal raised after any committed mutation
    pub fn changed(&self) -> &ChangeSignal {
        &self.changed
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_orders_by_timestamp() {
        let store = Store::new();
        store.samples.insert(Sample::new(3_000, 120)).unwrap();
        store.samples.insert(Sample::new(1_000, 100)).unwrap();
        store.samples.insert(Sample::new(2_000, 110)).unwrap();

        let rows = store.samples.query(&Query::all()).unwrap();
        let stamps: Vec<Timestamp> = rows.iter().map(|r| r.value.timestamp).collect();
        assert_eq!(stamps, [1_000, 2_000, 3_000]);
    }

    #[test]
    fn test_query_since_and_filter() {
        let store = Store::new();
        for (ts, value) in [(1_000, 100), (2_000, 0), (3_000, 140)] {
            store.samples.insert(Sample::new(ts, value)).unwrap();
        }

        let query = Query::all()
            .since(1_000)
            .filter(|sample: &Sample| sample.value != 0);
        let rows = store.samples.query(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value.value, 140);
    }

    #[test]
    fn test_update_bumps_revision() {
        let store = Store::new();
        let id = store.samples.insert(Sample::new(1_000, 100)).unwrap();
        store.samples.update(id, |sample| sample.value = 105).unwrap();

        let rows = store.samples.query(&Query::all()).unwrap();
        assert_eq!(rows[0].revision, 1);
        assert_eq!(rows[0].value.value, 105);
        assert!(matches!(
            store.samples.update(999, |_| {}),
            Err(AppError::UnknownRow(999))
        ));
    }

    #[test]
    fn test_closed_table_rejects_access() {
        let store = Store::new();
        store.log.close();
        assert!(!store.log.is_open());
        assert!(matches!(
            store.log.query(&Query::all()),
            Err(AppError::StoreUnavailable("log"))
        ));
        assert!(store.samples.query(&Query::all()).is_ok());

        store.log.reopen();
        assert!(store.log.query(&Query::all()).is_ok());
    }

    #[test]
    fn test_mutate_commits_once_and_signals() {
        let store = Store::new();
        store.changed().reset();

        let removed = store
            .samples
            .mutate(|tx| {
                tx.insert(Sample::new(1_000, 90));
                tx.insert(Sample::new(2_000, 95));
                tx.retain(|sample| sample.timestamp > 1_000)
            })
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.samples.len(), 1);
        assert!(store.changed().signaled());
    }

    #[test]
    fn test_noop_mutation_does_not_signal() {
        let store = Store::new();
        store.changed().reset();
        assert_eq!(store.log.clear().unwrap(), 0);
        assert!(!store.changed().signaled());
    }
}
