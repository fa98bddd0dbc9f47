// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-adapter bookkeeping of messages awaiting a reply.
//!
//! Maps the queue message id to the platform reply target. Entries live
//! until their reply is routed or until they are older than the TTL, after
//! which they can never route a reply again.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tinyrelay_core::MessageId;

/// Default staleness window for pending entries.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct PendingEntry<T> {
    target: T,
    enqueued_at: Instant,
}

/// In-memory map from message id to reply target, with time-based eviction.
#[derive(Debug)]
pub struct PendingReplyTracker<T> {
    entries: HashMap<MessageId, PendingEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> PendingReplyTracker<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&mut self, id: MessageId, target: T) {
        self.insert_at(id, target, Instant::now());
    }

    pub fn insert_at(&mut self, id: MessageId, target: T, now: Instant) {
        self.entries.insert(
            id,
            PendingEntry {
                target,
                enqueued_at: now,
            },
        );
    }

    /// Removes the entry for `id` and returns its target, unless it is stale.
    pub fn take(&mut self, id: &MessageId) -> Option<T> {
        self.take_at(id, Instant::now())
    }

    /// Like [`take`](Self::take) at an explicit instant. A stale entry is
    /// removed and `None` is returned.
    pub fn take_at(&mut self, id: &MessageId, now: Instant) -> Option<T> {
        let entry = self.entries.remove(id)?;
        if self.is_stale(&entry, now) {
            return None;
        }
        Some(entry.target)
    }

    /// Drops entries without a reply after the TTL; returns their ids.
    pub fn evict_stale(&mut self) -> Vec<MessageId> {
        self.evict_stale_at(Instant::now())
    }

    pub fn evict_stale_at(&mut self, now: Instant) -> Vec<MessageId> {
        let ttl = self.ttl;
        let mut evicted = Vec::new();
        self.entries.retain(|id, entry| {
            let keep = now.saturating_duration_since(entry.enqueued_at) < ttl;
            if !keep {
                evicted.push(id.clone());
            }
            keep
        });
        evicted
    }

    /// Targets of every live entry, for typing refresh.
    pub fn targets(&self) -> Vec<T> {
        self.entries.values().map(|e| e.target.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_stale(&self, entry: &PendingEntry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.enqueued_at) >= self.ttl
    }
}

impl<T: Clone> Default for PendingReplyTracker<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_TTL)
    }
}
