//! The two remote collaborator calls the lifecycle manager depends on.
//! Everything about the transport, wire format, and the rest of the
//! secret-store client API is the collaborator's concern, not this crate's.

use async_trait::async_trait;

use crate::{error::BackendError, token::AuthResult};

/// Obtains a fresh lease.
#[async_trait]
pub trait Login: Send + Sync {
    async fn login(&self) -> Result<AuthResult, BackendError>;
}

/// Extends an existing lease. Implementations must preserve or update
/// `renewable` and `lease_duration_seconds` to reflect the server's
/// response.
#[async_trait]
pub trait Renew: Send + Sync {
    async fn renew(
        &self,
        current: &AuthResult,
    ) -> Result<AuthResult, BackendError>;
}
