//! Live query subscriptions over store tables
//!
//! A [`ChangeFeed`] is owned by one component (the status page, the log
//! stream) and holds that component's live queries. Whenever the store
//! signals a commit the UI task calls [`ChangeFeed::dispatch`], which re-runs
//! every active query, diffs the result against the previous snapshot by row
//! id and revision, and hands the callback the fresh rows plus the counts of
//! inserted, deleted and updated rows.
//!
//! The owner's state is passed into `dispatch` and on to each callback, so
//! callbacks mutate their owner without shared ownership. All commits that
//! land between two dispatches are reported as one combined diff.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::storage::{Query, Record, Row, RowId, Table};

/// Row counts describing how a query result changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeDiff {
    pub inserted: usize,
    pub deleted: usize,
    pub updated: usize,
}

impl ChangeDiff {
    /// Compare two query snapshots
    pub fn between<T>(previous: &[Row<T>], current: &[Row<T>]) -> Self {
        let revisions: BTreeMap<RowId, u32> =
            previous.iter().map(|row| (row.id, row.revision)).collect();

        let mut diff = Self::default();
        let mut retained = 0;
        for row in current {
            match revisions.get(&row.id) {
                None => diff.inserted += 1,
                Some(&revision) => {
                    retained += 1;
                    if revision != row.revision {
                        diff.updated += 1;
                    }
                }
            }
        }
        diff.deleted = previous.len() - retained;
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.deleted == 0 && self.updated == 0
    }
}

/// Handle to a live query registration
///
/// An inactive handle was either never registered (store unavailable at
/// subscribe time) or has been unsubscribed.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: u32,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Callback invoked with the owner's state, the fresh rows and the diff
pub type OnChange<T, C> = Box<dyn FnMut(&mut C, &[Row<T>], ChangeDiff)>;

struct Registration<'s, T, C> {
    id: u32,
    table: &'s Table<T>,
    query: Query<T>,
    snapshot: Vec<Row<T>>,
    on_change: OnChange<T, C>,
}

/// Registry of live queries belonging to one owner of type `C`
pub struct ChangeFeed<'s, T, C> {
    registrations: Vec<Registration<'s, T, C>>,
    next_id: u32,
}

impl<'s, T: Record, C> ChangeFeed<'s, T, C> {
    pub const fn new() -> Self {
        Self {
            registrations: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a live query
    ///
    /// The current result becomes the baseline snapshot; the callback only
    /// fires for changes after this call. If the table cannot be queried the
    /// returned handle is inactive and nothing is registered.
    pub fn subscribe<F>(
        &mut self,
        table: &'s Table<T>,
        query: Query<T>,
        on_change: F,
    ) -> Subscription
    where
        F: FnMut(&mut C, &[Row<T>], ChangeDiff) + 'static,
    {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        match table.query(&query) {
            Ok(snapshot) => {
                debug!(" Subscribed {} to {}", id, table.name());
                self.registrations.push(Registration {
                    id,
                    table,
                    query,
                    snapshot,
                    on_change: Box::new(on_change),
                });
                Subscription { id, active: true }
            }
            Err(e) => {
                warn!(" Subscription to {} not registered: {}", table.name(), e);
                Subscription { id, active: false }
            }
        }
    }

    /// Remove a registration; its callback never fires again
    pub fn unsubscribe(&mut self, subscription: &mut Subscription) {
        if subscription.active {
            self.registrations.retain(|r| r.id != subscription.id);
            subscription.active = false;
            debug!(" Unsubscribed {}", subscription.id);
        }
    }

    /// Number of active registrations
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Current snapshot of a registration, if it is active
    pub fn snapshot(&self, subscription: &Subscription) -> Option<&[Row<T>]> {
        self.registrations
            .iter()
            .find(|r| r.id == subscription.id)
            .map(|r| r.snapshot.as_slice())
    }

    /// Re-run every live query and notify those whose result changed
    ///
    /// Returns the number of callbacks invoked. A query that fails is skipped
    /// for this cycle and retried on the next dispatch.
    pub fn dispatch(&mut self, owner: &mut C) -> usize {
        let mut fired = 0;
        for registration in self.registrations.iter_mut() {
            let rows = match registration.table.query(&registration.query) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(" Skipping refresh of subscription {}: {}", registration.id, e);
                    continue;
                }
            };

            let diff = ChangeDiff::between(&registration.snapshot, &rows);
            if diff.is_empty() {
                continue;
            }
            registration.snapshot = rows;
            (registration.on_change)(owner, &registration.snapshot, diff);
            fired += 1;
        }
        fired
    }
}

impl<T: Record, C> Default for ChangeFeed<'_, T, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Sample, Store};

    #[derive(Default)]
    struct Seen {
        diffs: Vec<ChangeDiff>,
        last_len: usize,
    }

    fn record(seen: &mut Seen, rows: &[Row<Sample>], diff: ChangeDiff) {
        seen.diffs.push(diff);
        seen.last_len = rows.len();
    }

    #[test]
    fn test_subscribe_primes_without_callback() {
        let store = Store::new();
        store.samples.insert(Sample::new(1_000, 100)).unwrap();

        let mut feed: ChangeFeed<Sample, Seen> = ChangeFeed::new();
        let sub = feed.subscribe(&store.samples, Query::all(), record);
        let mut seen = Seen::default();

        assert!(sub.is_active());
        assert_eq!(feed.snapshot(&sub).map(|rows| rows.len()), Some(1));
        assert_eq!(feed.dispatch(&mut seen), 0);
        assert!(seen.diffs.is_empty());
    }

    #[test]
    fn test_commits_between_dispatches_coalesce() {
        let store = Store::new();
        let existing = store.samples.insert(Sample::new(1_000, 100)).unwrap();
        store.samples.insert(Sample::new(2_000, 110)).unwrap();

        let mut feed: ChangeFeed<Sample, Seen> = ChangeFeed::new();
        feed.subscribe(&store.samples, Query::all(), record);

        store.samples.insert(Sample::new(3_000, 120)).unwrap();
        let fresh = store.samples.insert(Sample::new(4_000, 125)).unwrap();
        store.samples.update(fresh, |s| s.value = 126).unwrap();
        store.samples.update(existing, |s| s.value = 101).unwrap();
        store.samples.retain(|s| s.timestamp != 2_000).unwrap();

        let mut seen = Seen::default();
        assert_eq!(feed.dispatch(&mut seen), 1);
        assert_eq!(
            seen.diffs,
            [ChangeDiff {
                inserted: 2,
                deleted: 1,
                updated: 1
            }]
        );
        assert_eq!(seen.last_len, 3);
    }

    #[test]
    fn test_filtered_out_change_does_not_fire() {
        let store = Store::new();
        let mut feed: ChangeFeed<Sample, Seen> = ChangeFeed::new();
        feed.subscribe(
            &store.samples,
            Query::all().filter(|s: &Sample| s.value != 0),
            record,
        );

        store.samples.insert(Sample::new(1_000, 0)).unwrap();
        let mut seen = Seen::default();
        assert_eq!(feed.dispatch(&mut seen), 0);
    }

    #[test]
    fn test_unsubscribe_stops_callbacks() {
        let store = Store::new();
        let mut feed: ChangeFeed<Sample, Seen> = ChangeFeed::new();
        let mut sub = feed.subscribe(&store.samples, Query::all(), record);

        feed.unsubscribe(&mut sub);
        assert!(!sub.is_active());
        assert!(feed.is_empty());

        store.samples.insert(Sample::new(1_000, 100)).unwrap();
        let mut seen = Seen::default();
        assert_eq!(feed.dispatch(&mut seen), 0);
        assert!(seen.diffs.is_empty());
    }

    #[test]
    fn test_unavailable_store_yields_inactive_subscription() {
        let store = Store::new();
        store.samples.close();

        let mut feed: ChangeFeed<Sample, Seen> = ChangeFeed::new();
        let sub = feed.subscribe(&store.samples, Query::all(), record);
        assert!(!sub.is_active());
        assert!(feed.is_empty());

        store.samples.reopen();
        store.samples.insert(Sample::new(1_000, 100)).unwrap();
        let mut seen = Seen::default();
        assert_eq!(feed.dispatch(&mut seen), 0);
    }

    #[test]
    fn test_failed_dispatch_is_retried() {
        let store = Store::new();
        let mut feed: ChangeFeed<Sample, Seen> = ChangeFeed::new();
        feed.subscribe(&store.samples, Query::all(), record);
        let mut seen = Seen::default();

        store.samples.insert(Sample::new(1_000, 100)).unwrap();
        store.samples.close();
        assert_eq!(feed.dispatch(&mut seen), 0);

        store.samples.reopen();
        assert_eq!(feed.dispatch(&mut seen), 1);
        assert_eq!(seen.diffs[0].inserted, 1);
    }
}
