//! A scoped, timed wait that may be interrupted by cancellation.

use std::time::Duration;

use async_trait::async_trait;

use crate::{clock::ManualClock, error::Interrupted, notify_once::NotifyOnce};

/// Suspends the calling task for at least `duration`, returning normally on
/// completion or failing with [`Interrupted`] if cancelled first.
///
/// [`LifecycleRunner`](crate::runner::LifecycleRunner) suspends *only*
/// inside [`Sleeper::sleep`] — no other operation in this crate suspends.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration) -> Result<(), Interrupted>;
}

/// The real [`Sleeper`], backed by [`tokio::time::sleep`]. Races the timer
/// against a cancellation signal so [`Handle::cancel`](crate::facade::Handle::cancel)
/// can interrupt an in-progress wait.
pub struct TokioSleeper {
    cancel: NotifyOnce,
}

impl TokioSleeper {
    pub fn new(cancel: NotifyOnce) -> Self {
        Self { cancel }
    }
}

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        // Fresh clone each call: `NotifyOnce::clone` resets `have_recved`,
        // so every sleep gets a chance to observe a signal sent before it
        // started, exactly like a fresh subscriber would.
        let mut cancel = self.cancel.clone();
        tokio::select! {
            biased;
            () = cancel.recv() => Err(Interrupted),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// A test [`Sleeper`] driven by a [`ManualClock`]. Blocks until the clock
/// has been [`advance`](ManualClock::advance)d past the requested deadline,
/// or until cancelled.
pub struct ManualSleeper {
    clock: ManualClock,
    cancel: NotifyOnce,
}

impl ManualSleeper {
    pub fn new(clock: ManualClock, cancel: NotifyOnce) -> Self {
        Self { clock, cancel }
    }
}

#[async_trait]
impl Sleeper for ManualSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        use crate::clock::Clock;

        let deadline = self.clock.now() + duration;
        let mut cancel = self.cancel.clone();
        loop {
            if self.clock.now() >= deadline {
                return Ok(());
            }
            let woken = self.clock.wake.notified();
            tokio::select! {
                biased;
                () = cancel.recv() => return Err(Interrupted),
                () = woken => (),
            }
        }
    }
}
