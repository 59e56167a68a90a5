//! An injectable source of "now", so the renewal scheduler and backoff
//! policy can be driven deterministically in tests.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tokio::sync::Notify;

/// A monotonic source of "now".
///
/// [`SystemClock`] wraps [`Instant::now`]. [`ManualClock`] is advanced
/// explicitly by test code and wakes any [`crate::sleep::ManualSleeper`]
/// whose deadline has since elapsed.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock, backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A test clock whose "now" only moves when [`ManualClock::advance`] is
/// called. Shares a [`Notify`] with any [`crate::sleep::ManualSleeper`]s
/// built against it, so advancing the clock past a pending deadline wakes
/// the sleeper immediately instead of waiting for a real-time tick.
#[derive(Clone)]
pub struct ManualClock {
    epoch: Instant,
    elapsed: Arc<Mutex<Duration>>,
    pub(crate) wake: Arc<Notify>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Move "now" forward by `dur` and wake anything waiting on this clock.
    pub fn advance(&self, dur: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap();
        *elapsed += dur;
        drop(elapsed);
        self.wake.notify_waiters();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.epoch + *self.elapsed.lock().unwrap()
    }
}
