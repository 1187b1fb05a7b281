use std::collections::HashMap;

use async_trait::async_trait;
use bcrypt::{hash, verify};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use caixa_core::provider::{AuthState, IdentityProvider, ProviderIdentity, ProviderResult};
use caixa_core::{ProviderError, UserId};

// Low cost on purpose: this provider exists for tests and development.
const HASH_COST: u32 = 4;

// Consecutive failed attempts before the account is rate limited.
const MAX_FAILED_ATTEMPTS: u32 = 5;

struct Account {
    uid: UserId,
    email: String,
    password_hash: String,
    disabled: bool,
    failed_attempts: u32,
}

/// In-memory identity provider with bcrypt-hashed credentials.
///
/// Mirrors the behavior the engine depends on from the real provider:
/// credential checks, disabled accounts, failed-attempt rate limiting, a
/// current signed-in identity, and sign-in-state broadcast.
pub struct MemoryAuthProvider {
    // keyed by lowercased trimmed email
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<ProviderIdentity>>,
    events: broadcast::Sender<AuthState>,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            events,
        }
    }

    /// Identity currently signed in, if any. Test support.
    pub fn current_identity(&self) -> Option<ProviderIdentity> {
        self.current.read().clone()
    }

    /// Number of provisioned accounts. Test support.
    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    /// Flip an account's disabled flag. Test support.
    pub fn set_disabled(&self, email: &str, disabled: bool) {
        if let Some(account) = self.accounts.write().get_mut(&account_key(email)) {
            account.disabled = disabled;
        }
    }

    fn sign_in(&self, identity: ProviderIdentity) {
        *self.current.write() = Some(identity.clone());
        let _ = self.events.send(AuthState::SignedIn(identity));
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn email_is_well_formed(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

#[async_trait]
impl IdentityProvider for MemoryAuthProvider {
    async fn authenticate(&self, email: &str, password: &str) -> ProviderResult<ProviderIdentity> {
        let identity = {
            let mut accounts = self.accounts.write();
            let Some(account) = accounts.get_mut(&account_key(email)) else {
                return Err(ProviderError::UserNotFound);
            };
            if account.disabled {
                return Err(ProviderError::AccountDisabled);
            }
            if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
                return Err(ProviderError::RateLimited);
            }

            let ok = verify(password, &account.password_hash)
                .map_err(|err| ProviderError::Unavailable(err.to_string()))?;
            if !ok {
                account.failed_attempts += 1;
                return Err(ProviderError::InvalidCredentials);
            }

            account.failed_attempts = 0;
            ProviderIdentity {
                uid: account.uid.clone(),
                email: account.email.clone(),
            }
        };

        self.sign_in(identity.clone());
        Ok(identity)
    }

    async fn create_identity(
        &self,
        email: &str,
        password: &str,
    ) -> ProviderResult<ProviderIdentity> {
        if !email_is_well_formed(email) {
            return Err(ProviderError::InvalidEmail);
        }

        let key = account_key(email);
        let password_hash =
            hash(password, HASH_COST).map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        let identity = {
            let mut accounts = self.accounts.write();
            if accounts.contains_key(&key) {
                return Err(ProviderError::EmailAlreadyInUse);
            }

            let identity = ProviderIdentity {
                uid: UserId::new(),
                email: email.trim().to_string(),
            };
            accounts.insert(
                key,
                Account {
                    uid: identity.uid.clone(),
                    email: identity.email.clone(),
                    password_hash,
                    disabled: false,
                    failed_attempts: 0,
                },
            );
            identity
        };

        self.sign_in(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        *self.current.write() = None;
        let _ = self.events.send(AuthState::SignedOut);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> ProviderResult<()> {
        if !email_is_well_formed(email) {
            return Err(ProviderError::InvalidEmail);
        }
        if !self.accounts.read().contains_key(&account_key(email)) {
            return Err(ProviderError::UserNotFound);
        }
        // Message delivery is out of band; nothing further to do here.
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthState> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_authenticate() {
        let provider = MemoryAuthProvider::new();
        let created = provider
            .create_identity("a@x.com", "secret1")
            .await
            .unwrap();

        let authed = provider.authenticate("a@x.com", "secret1").await.unwrap();
        assert_eq!(created, authed);
        assert_eq!(provider.current_identity(), Some(authed));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let provider = MemoryAuthProvider::new();
        provider
            .create_identity("a@x.com", "secret1")
            .await
            .unwrap();

        let result = provider.create_identity("A@X.COM", "other-pass").await;
        assert_eq!(result, Err(ProviderError::EmailAlreadyInUse));
    }

    #[tokio::test]
    async fn wrong_password_then_rate_limit() {
        let provider = MemoryAuthProvider::new();
        provider
            .create_identity("a@x.com", "secret1")
            .await
            .unwrap();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            let result = provider.authenticate("a@x.com", "wrong").await;
            assert_eq!(result, Err(ProviderError::InvalidCredentials));
        }

        // even the right password is now rejected
        let result = provider.authenticate("a@x.com", "secret1").await;
        assert_eq!(result, Err(ProviderError::RateLimited));
    }

    #[tokio::test]
    async fn disabled_account_cannot_sign_in() {
        let provider = MemoryAuthProvider::new();
        provider
            .create_identity("a@x.com", "secret1")
            .await
            .unwrap();
        provider.set_disabled("a@x.com", true);

        let result = provider.authenticate("a@x.com", "secret1").await;
        assert_eq!(result, Err(ProviderError::AccountDisabled));
    }

    #[tokio::test]
    async fn sign_out_broadcasts_signed_out() {
        let provider = MemoryAuthProvider::new();
        let mut events = provider.subscribe();

        provider
            .create_identity("a@x.com", "secret1")
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        assert!(matches!(events.recv().await, Ok(AuthState::SignedIn(_))));
        assert!(matches!(events.recv().await, Ok(AuthState::SignedOut)));
        assert_eq!(provider.current_identity(), None);
    }

    #[tokio::test]
    async fn password_reset_requires_known_well_formed_email() {
        let provider = MemoryAuthProvider::new();
        provider
            .create_identity("a@x.com", "secret1")
            .await
            .unwrap();

        assert_eq!(
            provider.send_password_reset("not-an-email").await,
            Err(ProviderError::InvalidEmail)
        );
        assert_eq!(
            provider.send_password_reset("b@x.com").await,
            Err(ProviderError::UserNotFound)
        );
        assert_eq!(provider.send_password_reset("a@x.com").await, Ok(()));
    }
}
