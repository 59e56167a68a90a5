//! Computes the grace period, renewal deadline, and adaptive sleep
//! durations that drive the renew-loop (state S2 in
//! [`LifecycleRunner`](crate::runner::LifecycleRunner)).

use std::time::{Duration, Instant};

use crate::rng::RandomSource;

/// Grace is uniformly distributed in `[GRACE_FACTOR, 2*GRACE_FACTOR]` of
/// the TTL.
pub const GRACE_FACTOR: f64 = 0.10;
/// Fraction of the remaining time-to-deadline slept on each renew-loop
/// iteration.
pub const RENEW_WAIT_PROPORTION: f64 = 2.0 / 3.0;

/// Grace period for a lease with remaining TTL `ttl`, uniformly
/// distributed in `[0.10*ttl, 0.20*ttl)`. Zero TTL yields zero grace.
pub fn grace_period(ttl: Duration, rng: &mut dyn RandomSource) -> Duration {
    if ttl.is_zero() {
        return Duration::ZERO;
    }
    let base = ttl.mul_f64(GRACE_FACTOR);
    let jitter = ttl.mul_f64(GRACE_FACTOR * rng.next_f64());
    base + jitter
}

/// The renewal deadline: the latest instant at which the renew-loop will
/// attempt another renewal before falling back to re-acquisition.
pub fn renewal_deadline(expiration: Instant, grace: Duration) -> Instant {
    expiration
        .checked_sub(grace)
        .unwrap_or(expiration)
}

/// The next sleep duration for the renew-loop, computed from how much time
/// remains until `renewal_deadline`.
///
/// `sleep = remaining * RENEW_WAIT_PROPORTION + grace / 4`. The first term
/// shrinks geometrically as the deadline approaches, making the loop
/// iterate faster near the deadline; the additive `grace / 4` floors the
/// wait so the loop doesn't busy-spin once `remaining` gets small.
pub fn next_sleep_duration(
    now: Instant,
    renewal_deadline: Instant,
    grace: Duration,
) -> Duration {
    let remaining = renewal_deadline.saturating_duration_since(now);
    remaining.mul_f64(RENEW_WAIT_PROPORTION) + grace / 4
}

/// True if sleeping `sleep` starting at `now` would land at or past
/// `renewal_deadline`, in which case the renew-loop must exit and control
/// returns to acquisition.
pub fn should_exit_renew_loop(
    now: Instant,
    sleep: Duration,
    renewal_deadline: Instant,
) -> bool {
    now + sleep >= renewal_deadline
}
