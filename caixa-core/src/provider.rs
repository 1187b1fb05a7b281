//! Identity-provider collaborator seam.
//!
//! The provider owns credentials and the signed-in state; this core never
//! sees passwords beyond passing them through. Sign-in-state transitions
//! (including ones triggered outside this process) arrive on a broadcast
//! channel that the session manager consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::errors::ProviderError;
use crate::types::UserId;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Identity returned by the provider after a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Provider account id; doubles as the application user id.
    pub uid: UserId,
    pub email: String,
}

/// A provider sign-in-state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(ProviderIdentity),
    SignedOut,
}

/// External identity/authentication service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check credentials and mark the account signed in.
    async fn authenticate(&self, email: &str, password: &str) -> ProviderResult<ProviderIdentity>;

    /// Create a new credential and mark it signed in.
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<ProviderIdentity>;

    /// Clear the provider's signed-in state.
    async fn sign_out(&self) -> ProviderResult<()>;

    /// Trigger an out-of-band credential-reset message.
    async fn send_password_reset(&self, email: &str) -> ProviderResult<()>;

    /// Subscribe to sign-in-state transitions. Dropping the receiver cancels
    /// the subscription.
    fn subscribe(&self) -> broadcast::Receiver<AuthState>;
}
