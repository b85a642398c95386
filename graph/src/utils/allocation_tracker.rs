/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crossbeam_utils::CachePadded;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A shared counter of allocated bytes.
///
/// Graph builders report every compressed block they allocate, and graph
/// views report every block they release. Clones share the same counter.
///
/// An [empty](AllocationTracker::empty) tracker ignores all reports.
#[derive(Debug, Clone, Default)]
pub struct AllocationTracker(Option<Arc<CachePadded<AtomicUsize>>>);

impl AllocationTracker {
    /// Creates a tracker with a zero counter.
    pub fn new() -> Self {
        Self(Some(Arc::new(CachePadded::new(AtomicUsize::new(0)))))
    }

    /// Creates a tracker ignoring all reports.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_tracking(&self) -> bool {
        self.0.is_some()
    }

    pub fn add(&self, bytes: usize) {
        if let Some(counter) = &self.0 {
            counter.fetch_add(bytes, Ordering::Relaxed);
        }
    }

    /// # Panics
    ///
    /// Panics if more bytes are removed than were added.
    pub fn remove(&self, bytes: usize) {
        if let Some(counter) = &self.0 {
            let previous = counter.fetch_sub(bytes, Ordering::Relaxed);
            assert!(
                previous >= bytes,
                "Released {bytes} bytes, but only {previous} were tracked"
            );
        }
    }

    /// Returns the number of bytes currently tracked.
    pub fn tracked_bytes(&self) -> usize {
        self.0
            .as_ref()
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }
}

/// Bytes accounted to a tracker for as long as this value lives.
///
/// Compressed blocks share one instance through an [`Arc`], so the bytes are
/// removed from the tracker exactly when the last owner of the block drops
/// it.
#[derive(Debug)]
pub struct TrackedBytes {
    bytes: usize,
    tracker: AllocationTracker,
}

impl TrackedBytes {
    /// Adds `bytes` to `tracker`.
    pub fn new(tracker: &AllocationTracker, bytes: usize) -> Self {
        tracker.add(bytes);
        Self {
            bytes,
            tracker: tracker.clone(),
        }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for TrackedBytes {
    fn drop(&mut self) {
        self.tracker.remove(self.bytes);
        if self.tracker.is_tracking() {
            log::debug!("Freed {} tracked bytes", self.bytes);
        }
    }
}
