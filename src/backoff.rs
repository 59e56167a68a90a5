//! Jittered, doubling backoff for the re-acquire loop.
//!
//! Grown from the shape of `lexe-std`'s `get_backoff_iter` (a stateless
//! doubling iterator capped at a maximum) into an explicit value type,
//! since this spec requires each step to be independently jittered through
//! an injected [`RandomSource`], which the teacher's iterator has no need
//! for.

use std::time::Duration;

use crate::{error::Interrupted, rng::RandomSource, sleep::Sleeper};

/// Initial backoff wait: 1 second.
pub const INITIAL_WAIT: Duration = Duration::from_secs(1);
/// Maximum backoff wait: 8 minutes.
pub const MAX_WAIT: Duration = Duration::from_secs(8 * 60);
/// Jitter added to each nominal wait, as a fraction of that wait.
const JITTER_FACTOR: f64 = 0.10;

/// The nominal (un-jittered) current and max backoff durations.
///
/// `current` doubles (capped at `max`) on every [`BackoffState::advance`].
/// Call [`BackoffState::wait`] to sleep for the *jittered* duration of the
/// current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffState {
    pub current: Duration,
    pub max: Duration,
}

impl BackoffState {
    /// A fresh backoff state starting at [`INITIAL_WAIT`], capped at
    /// [`MAX_WAIT`]. Per spec.md open question (a), a new
    /// [`BackoffState`] is constructed every time the acquire loop is
    /// (re-)entered — backoff is never carried across acquisitions.
    pub fn new() -> Self {
        Self {
            current: INITIAL_WAIT,
            max: MAX_WAIT,
        }
    }

    /// The doubling step: `min(current * 2, max)`.
    pub fn next(self) -> Self {
        Self {
            current: self.current.saturating_mul(2).min(self.max),
            max: self.max,
        }
    }

    /// This step's duration jittered to 100%-110% of nominal, using `rng`.
    pub fn jittered(&self, rng: &mut dyn RandomSource) -> Duration {
        let extra = self.current.mul_f64(JITTER_FACTOR * rng.next_f64());
        self.current + extra
    }

    /// Sleep for this step's jittered duration via `sleeper`, then return
    /// the advanced state for the next step. Propagates [`Interrupted`]
    /// from the sleeper, which ends the caller's acquire loop.
    pub async fn wait(
        self,
        sleeper: &dyn Sleeper,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, Interrupted> {
        let duration = self.jittered(rng);
        sleeper.sleep(duration).await?;
        Ok(self.next())
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new()
    }
}
