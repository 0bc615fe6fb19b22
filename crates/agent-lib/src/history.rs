//! Bounded history of metric snapshots
//!
//! This module provides the in-memory ring buffer backing the "recent metrics"
//! view:
//! - Fixed capacity with FIFO eviction
//! - Time-windowed range queries
//! - Owned copies on every read so callers never alias internal state

use crate::models::{now_millis, Snapshot};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Default number of retained snapshots (one hour at a 60s cadence)
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Insertion-ordered ring buffer of snapshots
#[derive(Debug)]
pub struct HistoryStore {
    snapshots: RwLock<VecDeque<Snapshot>>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl HistoryStore {
    /// Create a store retaining at most `capacity` snapshots (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }

    /// Append a snapshot, evicting from the head until within capacity
    pub fn add_snapshot(&self, snapshot: Snapshot) {
        let mut snapshots = self.write();
        snapshots.push_back(snapshot);

        let mut evicted = 0usize;
        while snapshots.len() > self.capacity {
            snapshots.pop_front();
            evicted += 1;
        }

        if evicted > 0 {
            debug!(evicted, size = snapshots.len(), "Evicted snapshots from history");
        }
    }

    /// Snapshots from the last `minutes`, or the whole buffer when `minutes`
    /// is absent or not positive
    pub fn get_history(&self, minutes: Option<f64>) -> Vec<Snapshot> {
        self.get_history_at(minutes, now_millis())
    }

    /// Same as [`get_history`](Self::get_history) against an explicit clock.
    ///
    /// A snapshot is included when `timestamp >= now - minutes * 60_000`.
    pub fn get_history_at(&self, minutes: Option<f64>, now: i64) -> Vec<Snapshot> {
        let snapshots = self.read();

        match minutes {
            Some(minutes) if minutes > 0.0 => {
                let cutoff = now as f64 - minutes * MILLIS_PER_MINUTE;
                snapshots
                    .iter()
                    .filter(|s| s.timestamp as f64 >= cutoff)
                    .copied()
                    .collect()
            }
            _ => snapshots.iter().copied().collect(),
        }
    }

    /// Most recently appended snapshot
    pub fn get_latest(&self) -> Option<Snapshot> {
        self.read().back().copied()
    }

    pub fn get_size(&self) -> usize {
        self.read().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every snapshot; capacity is unchanged
    pub fn clear(&self) {
        self.write().clear();
    }

    // Poisoning is ignored: entries are plain values.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<Snapshot>> {
        self.snapshots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<Snapshot>> {
        self.snapshots.write().unwrap_or_else(PoisonError::into_inner)
    }
}
