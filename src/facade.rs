//! The public API: configure collaborators with [`LifecycleBuilder`], start
//! the manager in the background, and read the current credential through
//! the returned [`Handle`]/[`Reader`].

use std::{sync::Arc, time::Duration};

use crate::{
    clock::{Clock, SystemClock},
    collab::{Login, Renew},
    error::UsageError,
    notify_once::NotifyOnce,
    rng::OsRandomSource,
    runner::LifecycleRunner,
    sleep::{Sleeper, TokioSleeper},
    task::LxTask,
    token::{AuthResult, TokenCell},
};

/// Configuration surface recognized by the lifecycle manager: a required
/// [`Login`] and [`Renew`] collaborator, and an optional pre-fetched
/// [`AuthResult`] that lets the caller surface login errors synchronously
/// before the manager goes to the background.
///
/// `GRACE_FACTOR`, `RENEW_WAIT_PROPORTION`, and the backoff constants are
/// intentionally not configurable here; see `scheduler`/`backoff`.
#[derive(Default)]
pub struct LifecycleBuilder {
    login: Option<Arc<dyn Login>>,
    renew: Option<Arc<dyn Renew>>,
    initial_token: Option<AuthResult>,
}

impl LifecycleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(mut self, login: Arc<dyn Login>) -> Self {
        self.login = Some(login);
        self
    }

    pub fn renew(mut self, renew: Arc<dyn Renew>) -> Self {
        self.renew = Some(renew);
        self
    }

    /// A token the caller already fetched synchronously, e.g. so it can
    /// handle a login error directly instead of only seeing it in logs.
    /// The runner enters the renew loop with this token without calling
    /// `Login` first.
    pub fn initial_token(mut self, token: AuthResult) -> Self {
        self.initial_token = Some(token);
        self
    }

    /// Spawns the [`LifecycleRunner`] as a background task and returns a
    /// [`Handle`] to it. Fails eagerly with [`UsageError`] if `login` or
    /// `renew` weren't configured; the runner never starts in that case.
    pub fn start(self) -> Result<Handle, UsageError> {
        let login = self.login.ok_or(UsageError::MissingLogin)?;
        let renew = self.renew.ok_or(UsageError::MissingRenew)?;

        let cell = Arc::new(TokenCell::new());
        let cancel = NotifyOnce::new();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper::new(cancel.clone()));
        let rng = Box::new(OsRandomSource::new());

        let runner = LifecycleRunner::new(
            login,
            renew,
            clock,
            sleeper,
            rng,
            cell.clone(),
            self.initial_token,
        );

        let task = LxTask::spawn("lease-lifecycle-runner", runner.run());

        Ok(Handle {
            cell,
            cancel,
            task: Some(task),
        })
    }
}

/// A handle to a running [`LifecycleRunner`]. Cheaply cloneable readers are
/// obtained via [`Handle::await_ready`].
pub struct Handle {
    cell: Arc<TokenCell>,
    cancel: NotifyOnce,
    task: Option<LxTask<()>>,
}

impl Handle {
    /// Returns the currently published token.
    ///
    /// # Panics
    ///
    /// Panics if called before initialization. Callers should
    /// [`await_ready`](Self::await_ready) first.
    pub fn current(&self) -> AuthResult {
        self.cell
            .load()
            .expect("Handle::current called before await_ready")
            .auth
            .clone()
    }

    /// Blocks until the manager has successfully logged in at least once,
    /// then returns a [`Reader`] capability for repeated reads.
    pub async fn await_ready(&self) -> Reader {
        self.cell.await_initialized().await;
        Reader {
            cell: self.cell.clone(),
        }
    }

    /// Like [`await_ready`](Self::await_ready), but gives up after
    /// `timeout` and returns `None` instead of blocking forever.
    pub async fn await_ready_timeout(&self, timeout: Duration) -> Option<Reader> {
        tokio::time::timeout(timeout, self.await_ready()).await.ok()
    }

    /// Signals the runner to exit at its next suspension point (inside
    /// `Sleeper::sleep`). Does not attempt to revoke the current lease.
    pub fn cancel(&self) {
        self.cancel.send();
    }

    /// Waits for the background task to actually finish after
    /// [`cancel`](Self::cancel). Propagates any panic from the task.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(join_err) = task.await {
                tracing::error!(%join_err, "lifecycle runner task failed to join");
            }
        }
    }
}

/// A read-only capability for the current credential, obtained via
/// [`Handle::await_ready`]. Safe to clone and share across tasks.
#[derive(Clone)]
pub struct Reader {
    cell: Arc<TokenCell>,
}

impl Reader {
    /// Returns the latest [`AuthResult`]. Always returns a non-empty token,
    /// since this [`Reader`] could only be constructed after initialization.
    pub fn get(&self) -> AuthResult {
        self.cell
            .load()
            .expect("Reader can only be constructed after initialization")
            .auth
            .clone()
    }
}
