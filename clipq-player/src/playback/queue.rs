//! Clip queue
//!
//! Bounded FIFO of resolved clips waiting for the render session.
//!
//! Every read-modify-write (push + evict, check + pop) happens inside one
//! critical section, so producers on the HTTP side and the orchestration task
//! never observe a length above capacity or a half-applied pop.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Default maximum number of pending clips
pub const DEFAULT_CAPACITY: usize = 300;

/// A resolved clip waiting to be played
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueItem {
    /// Queue entry ID (event correlation)
    pub id: Uuid,
    /// Playable URL
    pub url: String,
    /// When the item entered the queue
    pub enqueued_at: DateTime<Utc>,
    /// Where the request came from (channel name)
    pub source_label: String,
}

impl QueueItem {
    pub fn new(url: impl Into<String>, source_label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            enqueued_at: clipq_common::time::now(),
            source_label: source_label.into(),
        }
    }
}

/// Thread-safe bounded FIFO
///
/// Oldest-first eviction: the newly inserted item is never the one dropped.
#[derive(Debug)]
pub struct ClipQueue {
    items: Mutex<VecDeque<QueueItem>>,
    capacity: usize,
}

impl ClipQueue {
    /// Create an empty queue holding at most `capacity` items
    ///
    /// A capacity of zero is raised to one so an insert always lands.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an item, evicting the oldest one if the queue is full
    ///
    /// Returns the evicted item, if any.
    pub fn enqueue(&self, item: QueueItem) -> Option<QueueItem> {
        let mut items = self.lock();
        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        evicted
    }

    /// Remove and return the oldest item (`None` when empty)
    pub fn pop_front(&self) -> Option<QueueItem> {
        self.lock().pop_front()
    }

    /// Snapshot count, observational only
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the pending items, oldest first
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueItem>> {
        // Critical sections never panic midway, so a poisoned lock still
        // guards a consistent deque.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ClipQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
