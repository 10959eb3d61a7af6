//! Request pacing and worker admission
//!
//! This module handles:
//! - A pool-wide rate limit (minimum gap between request starts)
//! - Bounding the number of URLs in flight via a semaphore
//!
//! Run-scope cancellation is a `tokio_util` [`CancellationToken`] owned by
//! the coordinator.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Pool-wide rate limiter
///
/// Every request start, from any worker and including retries, reserves the
/// next free slot. Slots are at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until this caller may start a request
    pub async fn acquire(&self) {
        let wait_until = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(slot + self.interval);
            slot
        };

        tokio::time::sleep_until(wait_until).await;
    }
}

/// A URL admitted to the worker pool, holding its slot until dropped
pub struct ScheduledFetch<T> {
    /// The work item
    pub item: T,

    /// The semaphore permit for this fetch
    pub _permit: OwnedSemaphorePermit,
}

/// Bounded worker pool admission
///
/// Permits are acquired in frontier order before a task is spawned, so with
/// a single worker URLs are processed strictly in sequence.
#[derive(Debug, Clone)]
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    workers: usize,
}

impl Scheduler {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Waits for a free worker slot and attaches it to `item`
    ///
    /// Returns `None` only if the pool has been closed.
    pub async fn admit<T>(&self, item: T) -> Option<ScheduledFetch<T>> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(ScheduledFetch {
            item,
            _permit: permit,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of idle worker slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
