//! The lease data model: [`AuthResult`], [`TokenWithExpiration`], and the
//! single-writer/many-reader publishing cell [`TokenCell`].

use std::{sync::Arc, time::Instant};

use arc_swap::ArcSwapOption;

use crate::notify_once::NotifyOnce;

/// The response value from a [`Login`](crate::collab::Login) or
/// [`Renew`](crate::collab::Renew) call: a bearer token, its lease
/// duration, and whether it can be renewed. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct AuthResult {
    pub client_token: String,
    pub lease_duration_seconds: u64,
    pub renewable: bool,
}

impl AuthResult {
    pub fn new(
        client_token: impl Into<String>,
        lease_duration_seconds: u64,
        renewable: bool,
    ) -> Self {
        Self {
            client_token: client_token.into(),
            lease_duration_seconds,
            renewable,
        }
    }
}

/// An [`AuthResult`] paired with its computed expiration instant.
///
/// `expiration` is `now_before_call + lease_duration_seconds`, where
/// `now_before_call` is sampled *before* the Login/Renew request was issued.
/// This pessimistic bias charges network latency against the TTL, so the
/// manager never considers a token valid past the server's own view of its
/// expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWithExpiration {
    pub auth: AuthResult,
    pub expiration: Instant,
}

impl TokenWithExpiration {
    /// Builds a [`TokenWithExpiration`] from an [`AuthResult`] and the
    /// instant sampled just before the call that produced it.
    pub fn new(auth: AuthResult, now_before_call: Instant) -> Self {
        let expiration = now_before_call
            + std::time::Duration::from_secs(auth.lease_duration_seconds);
        Self { auth, expiration }
    }

    /// The TTL remaining as of `now`. Saturates to zero once expired.
    pub fn remaining_ttl(&self, now: Instant) -> std::time::Duration {
        self.expiration.saturating_duration_since(now)
    }
}

/// Single-writer/many-reader publishing cell for the current
/// [`TokenWithExpiration`].
///
/// Backed by [`ArcSwapOption`] (store-release/load-acquire), so readers
/// that observe a non-empty cell also observe a fully constructed
/// [`AuthResult`] — and by a [`NotifyOnce`]-style one-shot latch that
/// transitions false→true exactly once, the first time a non-empty value
/// is stored, and is never reset.
pub struct TokenCell {
    slot: ArcSwapOption<TokenWithExpiration>,
    initialized: NotifyOnce,
}

impl TokenCell {
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            initialized: NotifyOnce::new(),
        }
    }

    /// Atomically replaces the current value. Raises the initialized
    /// signal if this is the first store.
    pub fn store(&self, token: TokenWithExpiration) {
        self.slot.store(Some(Arc::new(token)));
        self.initialized.send();
    }

    /// Atomic read of the current value, if any has been stored yet.
    pub fn load(&self) -> Option<Arc<TokenWithExpiration>> {
        self.slot.load_full()
    }

    /// Blocks until the cell has been initialized at least once.
    ///
    /// NOTE: each caller must use its own [`NotifyOnce`] clone (obtained via
    /// [`TokenCell::initialized_signal`]) to observe the signal, since a
    /// given clone can only be recv'd from once; [`TokenCell`] hands out a
    /// fresh clone to every caller of [`await_initialized`](Self::await_initialized).
    pub async fn await_initialized(&self) {
        self.initialized_signal().recv().await
    }

    /// A fresh handle on the one-shot initialized signal, safe to `recv`
    /// independently of any other handle.
    pub fn initialized_signal(&self) -> NotifyOnce {
        self.initialized.clone()
    }

    /// True if a value has ever been stored.
    pub fn is_initialized(&self) -> bool {
        self.initialized.try_recv()
    }
}

impl Default for TokenCell {
    fn default() -> Self {
        Self::new()
    }
}
