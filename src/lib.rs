//! A credential-lifecycle manager for short-lived bearer leases issued by a
//! remote secret-management service.
//!
//! A client application needs a continuously valid bearer credential to
//! authenticate its own outbound calls. Leases have a bounded
//! time-to-live and must either be renewed before expiry or, once renewal
//! is no longer possible, replaced by acquiring a fresh one.
//! [`LifecycleRunner`](runner::LifecycleRunner) runs this as a background
//! task and publishes the current valid credential to concurrent readers
//! through [`TokenCell`](token::TokenCell).
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use lease_lifecycle::{LifecycleBuilder, Login, Renew, AuthResult, BackendError};
//! # use async_trait::async_trait;
//! # struct MyLogin;
//! # #[async_trait]
//! # impl Login for MyLogin {
//! #     async fn login(&self) -> Result<AuthResult, BackendError> {
//! #         Ok(AuthResult::new("token", 3600, true))
//! #     }
//! # }
//! # struct MyRenew;
//! # #[async_trait]
//! # impl Renew for MyRenew {
//! #     async fn renew(&self, _current: &AuthResult) -> Result<AuthResult, BackendError> {
//! #         Ok(AuthResult::new("token", 3600, true))
//! #     }
//! # }
//! # async fn example() {
//! let mut handle = LifecycleBuilder::new()
//!     .login(Arc::new(MyLogin))
//!     .renew(Arc::new(MyRenew))
//!     .start()
//!     .expect("login and renew are configured");
//!
//! let reader = handle.await_ready().await;
//! let token = reader.get();
//! println!("bearer token: {}", token.client_token);
//!
//! handle.cancel();
//! handle.join().await;
//! # }
//! ```

pub mod backoff;
pub mod clock;
pub mod collab;
pub mod error;
pub mod facade;
pub mod notify_once;
pub mod rng;
pub mod runner;
pub mod scheduler;
pub mod sleep;
pub mod task;
pub mod token;

pub use crate::{
    collab::{Login, Renew},
    error::{BackendError, Interrupted, UsageError},
    facade::{Handle, LifecycleBuilder, Reader},
    token::AuthResult,
};
