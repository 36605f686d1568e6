//! # Scout Core - Rate Limiting Utilities
//!
//! Per-resource admission control. Each pooled client owns one limiter so it
//! stays within the explorer's documented quota no matter how many workers
//! route through it.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Schedule-ahead leaky bucket: `take` never rejects, it waits for the next
/// free slot. Slots are spaced `window / quota` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    /// Earliest instant the next caller may proceed.
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub const WINDOW: Duration = Duration::from_secs(60);

    /// Limiter admitting `quota` calls per rolling 60 second window.
    /// A zero quota is clamped to one call per window.
    pub fn per_minute(quota: u32) -> Self {
        Self::new(quota, Self::WINDOW)
    }

    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            interval: window / quota.max(1),
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserves the next slot and waits for it. The lock is only held while
    /// reserving, so concurrent callers queue up in reservation order.
    pub async fn take(&self) -> Instant {
        let slot = self.reserve(Instant::now());
        if slot > Instant::now() {
            trace!("rate limiter waiting {:?}", slot - Instant::now());
            sleep_until(slot).await;
        }
        slot
    }

    fn reserve(&self, now: Instant) -> Instant {
        let mut next = self.next_slot.lock();
        let slot = match *next {
            Some(at) if at > now => at,
            _ => now,
        };
        *next = Some(slot + self.interval);
        slot
    }
}
