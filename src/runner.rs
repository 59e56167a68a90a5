//! [`LifecycleRunner`]: the top-level state machine. Acquires a lease,
//! renews it until the renew-loop can no longer schedule another attempt
//! inside its grace window, then re-acquires. Runs until cancelled.
//!
//! ```text
//!      (no initial token)
//!  S0 ────────────────────▶ S1 Acquiring ──login ok──▶ S2 RenewLoop
//!  S0 ──(initial token)────────────────────────────────▶ S2 RenewLoop
//!                              ▲                │  loop exit
//!                              │   backoff.wait  │  (can't fit another
//!                       S3 Backoff ◀─login err    │   renewal before grace)
//!                              │                  │
//!                              └──────────────────┘
//!  any state ──Interrupted from Sleeper.sleep──▶ S4 Terminated
//! ```

use std::sync::Arc;

use crate::{
    backoff::BackoffState,
    clock::Clock,
    collab::{Login, Renew},
    error::Interrupted,
    rng::RandomSource,
    scheduler::{grace_period, next_sleep_duration, renewal_deadline, should_exit_renew_loop},
    sleep::Sleeper,
    token::{AuthResult, TokenCell, TokenWithExpiration},
};

/// The top-level state machine, owning the shared [`TokenCell`] and all of
/// its injected collaborators.
pub struct LifecycleRunner {
    login: Arc<dyn Login>,
    renew: Arc<dyn Renew>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    rng: Box<dyn RandomSource>,
    cell: Arc<TokenCell>,
    initial_token: Option<AuthResult>,
}

impl LifecycleRunner {
    pub fn new(
        login: Arc<dyn Login>,
        renew: Arc<dyn Renew>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
        rng: Box<dyn RandomSource>,
        cell: Arc<TokenCell>,
        initial_token: Option<AuthResult>,
    ) -> Self {
        Self {
            login,
            renew,
            clock,
            sleeper,
            rng,
            cell,
            initial_token,
        }
    }

    /// Runs the state machine until cancellation. This is the only async
    /// entrypoint; it suspends only inside `Sleeper::sleep`.
    pub async fn run(mut self) {
        let mut token = match self.initial_token.take() {
            // S0 -> S2: a pre-fetched token skips straight to the renew
            // loop, without calling Login first.
            Some(auth) => {
                let now = self.clock.now();
                let token = TokenWithExpiration::new(auth, now);
                self.cell.store(token.clone());
                Some(token)
            }
            // S0 -> S1
            None => None,
        };

        loop {
            let current = match token {
                Some(t) => t,
                None => match self.acquire().await {
                    Some(t) => t,
                    None => {
                        tracing::info!("lifecycle runner cancelled during acquire; terminating");
                        return;
                    }
                },
            };

            match self.renew_loop(current).await {
                Some(()) => token = None, // loop exited naturally; re-acquire
                None => {
                    tracing::info!("lifecycle runner cancelled during renew loop; terminating");
                    return;
                }
            }
        }
    }

    /// S1 Acquiring / S3 Backoff: call Login until it succeeds, backing off
    /// between attempts. Login failures are tolerated forever. Returns
    /// `None` only on cancellation.
    async fn acquire(&mut self) -> Option<TokenWithExpiration> {
        let mut backoff = BackoffState::new();
        loop {
            let now_before_call = self.clock.now();
            match self.login.login().await {
                Ok(auth) => {
                    let token = TokenWithExpiration::new(auth, now_before_call);
                    self.cell.store(token.clone());
                    tracing::info!("login succeeded; lease acquired");
                    return Some(token);
                }
                Err(err) => {
                    tracing::warn!(
                        %err,
                        retry_in_ms = backoff.current.as_millis() as u64,
                        "login failed; retrying with backoff",
                    );
                    match backoff.wait(self.sleeper.as_ref(), self.rng.as_mut()).await {
                        Ok(next) => backoff = next,
                        Err(Interrupted) => return None,
                    }
                }
            }
        }
    }

    /// S2 RenewLoop: renew the lease until the loop can no longer schedule
    /// another attempt inside the grace window. Renew failures are
    /// tolerated within the current lease. Returns `Some(())` when the loop
    /// exits naturally (control returns to acquisition), `None` only on
    /// cancellation.
    async fn renew_loop(&mut self, mut current: TokenWithExpiration) -> Option<()> {
        let now = self.clock.now();
        let mut grace = grace_period(current.remaining_ttl(now), self.rng.as_mut());
        let mut deadline = renewal_deadline(current.expiration, grace);

        loop {
            if current.auth.renewable {
                let now_before_call = self.clock.now();
                match self.renew.renew(&current.auth).await {
                    Ok(auth) => {
                        current = TokenWithExpiration::new(auth, now_before_call);
                        self.cell.store(current.clone());
                        let now = self.clock.now();
                        grace = grace_period(current.remaining_ttl(now), self.rng.as_mut());
                        deadline = renewal_deadline(current.expiration, grace);
                        tracing::debug!("renew succeeded");
                    }
                    Err(err) => {
                        tracing::warn!(%err, "renew failed; retrying within current lease");
                    }
                }
            }

            let now = self.clock.now();
            let sleep = next_sleep_duration(now, deadline, grace);
            if should_exit_renew_loop(now, sleep, deadline) {
                tracing::info!("renew loop exhausted grace window; re-acquiring");
                return Some(());
            }

            match self.sleeper.sleep(sleep).await {
                Ok(()) => (),
                Err(Interrupted) => return None,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::{
        clock::ManualClock,
        collab::test_support::ScriptedBackend,
        notify_once::NotifyOnce,
        rng::SmallRng,
        sleep::ManualSleeper,
        token::AuthResult,
    };

    fn new_runner(
        clock: ManualClock,
        cancel: NotifyOnce,
        backend: Arc<ScriptedBackend>,
        cell: Arc<TokenCell>,
        initial_token: Option<AuthResult>,
        seed: u64,
    ) -> LifecycleRunner {
        let sleeper = Arc::new(ManualSleeper::new(clock.clone(), cancel));
        LifecycleRunner::new(
            backend.clone(),
            backend,
            Arc::new(clock),
            sleeper,
            Box::new(SmallRng::from_u64(seed)),
            cell,
            initial_token,
        )
    }

    /// Drives a manual clock forward in fixed ticks while a background task
    /// is progressing, giving each tick a chance to be observed.
    async fn advance_in_ticks(clock: &ManualClock, total: Duration, tick: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            clock.advance(tick);
            elapsed += tick;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn s_happy_path_keeps_token_valid_across_many_renewals() {
        let clock = ManualClock::new();
        let cancel = NotifyOnce::new();
        let backend = Arc::new(ScriptedBackend::new(
            vec![Ok(AuthResult::new("t0", 3600, true))],
            vec![Ok(AuthResult::new("tN", 3600, true))],
        ));
        let cell = Arc::new(TokenCell::new());
        let runner = new_runner(clock.clone(), cancel.clone(), backend.clone(), cell.clone(), None, 1);

        let handle = tokio::spawn(runner.run());
        cell.await_initialized().await;

        advance_in_ticks(&clock, Duration::from_secs(8 * 24 * 3600), Duration::from_millis(50)).await;

        assert!(cell.load().is_some());
        let now = clock.now();
        assert!(cell.load().unwrap().remaining_ttl(now) > Duration::ZERO);

        cancel.send();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn s_nonrenewable_reacquires_near_ttl_minus_grace() {
        let clock = ManualClock::new();
        let cancel = NotifyOnce::new();
        let backend = Arc::new(ScriptedBackend::new(
            vec![
                Ok(AuthResult::new("t0", 60, false)),
                Ok(AuthResult::new("t1", 60, false)),
                Ok(AuthResult::new("t2", 60, false)),
            ],
            vec![],
        ));
        let cell = Arc::new(TokenCell::new());
        let runner = new_runner(clock.clone(), cancel.clone(), backend.clone(), cell.clone(), None, 2);

        let handle = tokio::spawn(runner.run());
        cell.await_initialized().await;

        advance_in_ticks(&clock, Duration::from_secs(200), Duration::from_millis(100)).await;

        // Non-renewable leases re-acquire repeatedly; a 200s run with 60s
        // leases (minus ~6-12s grace) should re-login at least twice.
        assert!(backend.login_call_count() >= 2);
        assert_eq!(backend.renew_call_count(), 0);

        cancel.send();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn s_initial_token_skips_login() {
        let clock = ManualClock::new();
        let cancel = NotifyOnce::new();
        let backend = Arc::new(ScriptedBackend::new(
            vec![Ok(AuthResult::new("should-not-be-used", 60, true))],
            vec![Ok(AuthResult::new("t1", 3600, true))],
        ));
        let cell = Arc::new(TokenCell::new());
        let initial = AuthResult::new("initial", 3600, true);
        let runner = new_runner(
            clock.clone(),
            cancel.clone(),
            backend.clone(),
            cell.clone(),
            Some(initial.clone()),
            3,
        );

        let handle = tokio::spawn(runner.run());
        cell.await_initialized().await;

        assert_eq!(cell.load().unwrap().auth, initial);
        assert_eq!(backend.login_call_count(), 0);

        cancel.send();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn s_cancel_during_renew_loop_sleep_stops_the_runner() {
        let clock = ManualClock::new();
        let cancel = NotifyOnce::new();
        let backend = Arc::new(ScriptedBackend::new(
            vec![Ok(AuthResult::new("t0", 3600, true))],
            vec![Ok(AuthResult::new("t1", 3600, true))],
        ));
        let cell = Arc::new(TokenCell::new());
        let runner = new_runner(clock.clone(), cancel.clone(), backend.clone(), cell.clone(), None, 4);

        let handle = tokio::spawn(runner.run());
        cell.await_initialized().await;

        // Let the runner settle into its first renew-loop sleep.
        advance_in_ticks(&clock, Duration::from_secs(5), Duration::from_millis(50)).await;

        let last_token = cell.load().unwrap();
        cancel.send();
        handle.await.unwrap();

        // No further stores occur after cancellation.
        let after = cell.load().unwrap();
        assert_eq!(after.auth, last_token.auth);
    }

    /// A [`Renew`] double that fails a fixed fraction of calls, driven by
    /// its own seeded RNG independent of the runner's.
    struct FlakyRenew {
        fail_fraction: f64,
        calls: std::sync::atomic::AtomicUsize,
        login_calls: std::sync::atomic::AtomicUsize,
        rng: std::sync::Mutex<SmallRng>,
    }

    impl FlakyRenew {
        fn new(fail_fraction: f64, seed: u64) -> Self {
            Self {
                fail_fraction,
                calls: std::sync::atomic::AtomicUsize::new(0),
                login_calls: std::sync::atomic::AtomicUsize::new(0),
                rng: std::sync::Mutex::new(SmallRng::from_u64(seed)),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }

        fn login_call_count(&self) -> usize {
            self.login_calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Login for FlakyRenew {
        async fn login(&self) -> Result<AuthResult, crate::error::BackendError> {
            self.login_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(AuthResult::new("relogin", 3600, true))
        }
    }

    #[async_trait::async_trait]
    impl Renew for FlakyRenew {
        async fn renew(&self, current: &AuthResult) -> Result<AuthResult, crate::error::BackendError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let roll = self.rng.lock().unwrap().next_f64();
            if roll < self.fail_fraction {
                Err(crate::error::BackendError::new("simulated flake"))
            } else {
                Ok(AuthResult::new(current.client_token.clone(), 3600, true))
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn s_flaky_renew_stays_on_one_lease_despite_intermittent_failures() {
        let clock = ManualClock::new();
        let cancel = NotifyOnce::new();
        let backend = Arc::new(FlakyRenew::new(0.2, 42));
        let cell = Arc::new(TokenCell::new());

        let sleeper = Arc::new(ManualSleeper::new(clock.clone(), cancel.clone()));
        let runner = LifecycleRunner::new(
            backend.clone(),
            backend.clone(),
            Arc::new(clock.clone()),
            sleeper,
            Box::new(SmallRng::from_u64(99)),
            cell.clone(),
            None,
        );

        let handle = tokio::spawn(runner.run());
        cell.await_initialized().await;

        advance_in_ticks(&clock, Duration::from_secs(8 * 24 * 3600), Duration::from_millis(50)).await;

        // ~20% renew failures should be absorbed within the current lease's
        // grace window; the runner should not need to fall back to many
        // fresh logins over an 8-day span.
        assert!(cell.load().is_some());
        assert!(backend.call_count() > 0);
        // Intermittent renew failures are absorbed within the current lease's
        // grace window; a single login at startup should suffice for the
        // whole 8-day run.
        assert_eq!(backend.login_call_count(), 1);

        cancel.send();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn s_outage_login_retries_with_backoff_then_succeeds() {
        let clock = ManualClock::new();
        let cancel = NotifyOnce::new();
        let failure = Err(crate::error::BackendError::new("unavailable"));
        let backend = Arc::new(ScriptedBackend::new(
            vec![
                failure.clone(),
                failure.clone(),
                failure.clone(),
                failure.clone(),
                failure,
                Ok(AuthResult::new("t1", 600, true)),
            ],
            vec![Ok(AuthResult::new("t2", 600, true))],
        ));
        let cell = Arc::new(TokenCell::new());
        let runner = new_runner(clock.clone(), cancel.clone(), backend.clone(), cell.clone(), None, 5);

        let handle = tokio::spawn(runner.run());

        // 5 failed attempts backoff ~1+2+4+8+16 = 31s nominal, plus jitter.
        advance_in_ticks(&clock, Duration::from_secs(40), Duration::from_millis(100)).await;
        cell.await_initialized().await;

        assert_eq!(backend.login_call_count(), 6);
        assert_eq!(cell.load().unwrap().auth.client_token, "t1");

        cancel.send();
        handle.await.unwrap();
    }
}
