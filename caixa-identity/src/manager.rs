//! The identity session manager.
//!
//! Orchestrates provider authentication, profile loading, tenant resolution,
//! session composition, write-through caching, and the standing auth-state
//! subscription. There is no ambient "current session" global: the latest
//! session lives in a watch channel, and every consumer reads a point-in-time
//! snapshot that may already be stale by the time it is acted on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use caixa_core::provider::{AuthState, ProviderIdentity};
use caixa_core::{
    AuthError, DocumentStore, IdentityError, IdentityProvider, IdentityResult, LocalCache,
    NewUserProfile, Provenance, Session, TenantId, TenantSeed, User, UserId, ValidationError,
};

use crate::documents::{decode, encode};
use crate::grants::GrantDirectory;
use crate::options::IdentityOptions;
use crate::provisioner::TenantProvisioner;
use crate::resolver::TenantResolver;
use crate::session_cache::SessionCache;

/// Outcome of a registration.
///
/// `Partial` means the provider credential and the user profile exist but
/// tenant provisioning failed. The user is deliberately not rolled back: the
/// provider credential cannot be transactionally tied to a document-store
/// write, so the caller gets the valid tenant-less session plus the
/// provisioning error and can offer remediation.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    Complete(Session),
    Partial {
        session: Session,
        error: IdentityError,
    },
}

impl RegisterOutcome {
    pub fn session(&self) -> &Session {
        match self {
            Self::Complete(session) => session,
            Self::Partial { session, .. } => session,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }
}

/// Authenticates users, resolves their active tenant, and keeps the
/// published session in step with the provider's sign-in state.
///
/// Must be created inside a Tokio runtime: construction spawns the standing
/// auth-state listener, which is aborted when the manager is dropped.
pub struct IdentitySessionManager {
    inner: Arc<ManagerInner>,
    listener: JoinHandle<()>,
}

struct ManagerInner {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    grants: GrantDirectory,
    resolver: TenantResolver,
    provisioner: TenantProvisioner,
    cache: SessionCache,
    options: IdentityOptions,
    sessions: watch::Sender<Option<Session>>,
    // Monotonic sequence for session derivations; a derivation publishes
    // only if nothing newer has been published meanwhile (rapid sign-in/out
    // must not let a late completion overwrite a newer session).
    seq: AtomicU64,
    published_seq: Mutex<u64>,
}

impl IdentitySessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn LocalCache>,
        options: IdentityOptions,
    ) -> IdentityResult<Self> {
        options.validate()?;

        let grants = GrantDirectory::new(store.clone(), options.collections.clone());
        let resolver = TenantResolver::new(store.clone(), grants.clone(), options.collections.clone());
        let provisioner = TenantProvisioner::new(store.clone(), &options);
        let session_cache = SessionCache::new(cache, options.cache_key.clone());
        let (sessions, _) = watch::channel(None);

        let inner = Arc::new(ManagerInner {
            provider,
            store,
            grants,
            resolver,
            provisioner,
            cache: session_cache,
            options,
            sessions,
            seq: AtomicU64::new(0),
            published_seq: Mutex::new(0),
        });

        let listener = Self::spawn_listener(inner.clone());
        Ok(Self { inner, listener })
    }

    /// Authenticate and compose a session, optionally pinned to an explicit
    /// tenant.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        explicit_tenant: Option<&TenantId>,
    ) -> IdentityResult<Session> {
        let inner = &self.inner;
        let identity = inner.provider.authenticate(email, password).await?;

        let Some(mut user) = inner.load_profile(&identity.uid).await? else {
            // A provider account without an application profile is invalid:
            // force sign-out rather than silently auto-provisioning one.
            inner.force_sign_out("authenticated identity has no application profile").await;
            return Err(AuthError::ProfileMissing.into());
        };

        let resolution = inner.resolver.resolve(&user, explicit_tenant).await?;

        user.last_login_at = Some(Utc::now());
        user.last_tenant_id = resolution.tenant.as_ref().map(|t| t.id.clone());
        inner
            .store
            .update_fields(
                &inner.options.collections.users,
                user.id.as_str(),
                json!({
                    "last_login_at": user.last_login_at,
                    "last_tenant_id": user.last_tenant_id,
                }),
            )
            .await?;

        let session = Session::compose(
            user,
            resolution.tenant,
            resolution.grant,
            Provenance::Resolved,
        );
        inner.finish_session(&session);
        info!(user_id = %session.user.id, tenant = ?session.tenant_id(), "login complete");
        Ok(session)
    }

    /// Create a provider credential and application profile, optionally
    /// provisioning a first tenant from `seed`.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: NewUserProfile,
        seed: Option<TenantSeed>,
    ) -> IdentityResult<RegisterOutcome> {
        let inner = &self.inner;

        // Fail fast on caller input before any provider call.
        inner.validate_registration(email, password, &profile, seed.as_ref())?;

        let identity = inner.provider.create_identity(email, password).await?;
        let user = User::new(identity.uid.clone(), identity.email.clone(), profile);
        inner
            .store
            .set_document(
                &inner.options.collections.users,
                user.id.as_str(),
                encode(&user)?,
            )
            .await?;

        let Some(seed) = seed else {
            let session = Session::compose(user, None, None, Provenance::Resolved);
            inner.finish_session(&session);
            info!(user_id = %session.user.id, "registration complete");
            return Ok(RegisterOutcome::Complete(session));
        };

        match inner.provisioner.create_tenant(seed, &user).await {
            Ok(tenant) => {
                let mut user = user;
                let resolution = inner.resolver.resolve(&user, Some(&tenant.id)).await?;

                user.last_tenant_id = Some(tenant.id.clone());
                inner
                    .store
                    .update_fields(
                        &inner.options.collections.users,
                        user.id.as_str(),
                        json!({ "last_tenant_id": user.last_tenant_id }),
                    )
                    .await?;

                let session = Session::compose(
                    user,
                    resolution.tenant,
                    resolution.grant,
                    Provenance::Resolved,
                );
                inner.finish_session(&session);
                info!(user_id = %session.user.id, tenant_id = %tenant.id, "registration complete");
                Ok(RegisterOutcome::Complete(session))
            }
            Err(error) => {
                // The user is not rolled back; surface a distinguishable
                // partial outcome with the valid tenant-less session.
                warn!(
                    user_id = %user.id,
                    error = %error,
                    "tenant provisioning failed after user creation"
                );
                let session = Session::compose(user, None, None, Provenance::Resolved);
                inner.finish_session(&session);
                Ok(RegisterOutcome::Partial { session, error })
            }
        }
    }

    /// Clear the provider session, the cache, and the published session.
    /// Side-effect only; never fails the caller.
    pub async fn logout(&self) {
        if let Err(err) = self.inner.provider.sign_out().await {
            warn!(error = %err, "provider sign-out failed, clearing local session anyway");
        }
        self.inner.cache.clear();
        self.inner.publish_latest(None);
        info!("logout complete");
    }

    /// Trigger an out-of-band credential-reset message.
    pub async fn reset_password(&self, email: &str) -> IdentityResult<()> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail.into());
        }
        self.inner.provider.send_password_reset(email).await?;
        Ok(())
    }

    /// Re-bind the current session to an explicitly chosen tenant.
    pub async fn switch_tenant(&self, tenant_id: &TenantId) -> IdentityResult<Session> {
        let inner = &self.inner;
        let current = self.current_session();
        let Some(current) = current else {
            return Err(AuthError::NotSignedIn.into());
        };

        let mut user = current.user;
        let resolution = inner.resolver.resolve(&user, Some(tenant_id)).await?;

        user.last_tenant_id = resolution.tenant.as_ref().map(|t| t.id.clone());
        inner
            .store
            .update_fields(
                &inner.options.collections.users,
                user.id.as_str(),
                json!({ "last_tenant_id": user.last_tenant_id }),
            )
            .await?;

        let session = Session::compose(
            user,
            resolution.tenant,
            resolution.grant,
            Provenance::Resolved,
        );
        inner.finish_session(&session);
        info!(user_id = %session.user.id, tenant_id = %tenant_id, "tenant switched");
        Ok(session)
    }

    /// Subscribe to the published session. Emits the current value first;
    /// dropping the receiver cancels the subscription.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.sessions.subscribe()
    }

    /// Point-in-time snapshot of the published session.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.sessions.borrow().as_ref().cloned()
    }

    /// The tenant resolver, for callers that need resolution without a full
    /// login round trip.
    pub fn resolver(&self) -> &TenantResolver {
        &self.inner.resolver
    }

    /// The tenant provisioner.
    pub fn provisioner(&self) -> &TenantProvisioner {
        &self.inner.provisioner
    }

    /// The access-grant directory.
    pub fn grants(&self) -> &GrantDirectory {
        &self.inner.grants
    }

    // The standing auth-state listener. Every provider sign-in-state
    // transition (including cross-process ones) re-derives the session;
    // derivations run on their own tasks so a slow resolution never blocks
    // newer events, and the sequence guard drops superseded results.
    fn spawn_listener(inner: Arc<ManagerInner>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut events = inner.provider.subscribe();
            loop {
                let state = match events.recv().await {
                    Ok(state) => state,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth-state subscription lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let seq = inner.next_seq();
                let task_inner = inner.clone();
                tokio::spawn(async move {
                    let session = match state {
                        AuthState::SignedOut => None,
                        AuthState::SignedIn(identity) => {
                            match task_inner.derive_session(&identity).await {
                                Ok(session) => session,
                                Err(err) => {
                                    warn!(error = %err, "session re-derivation failed");
                                    None
                                }
                            }
                        }
                    };
                    task_inner.publish(seq, session);
                });
            }
        })
    }
}

impl Drop for IdentitySessionManager {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl ManagerInner {
    fn validate_registration(
        &self,
        email: &str,
        password: &str,
        profile: &NewUserProfile,
        seed: Option<&TenantSeed>,
    ) -> Result<(), ValidationError> {
        let min = self.options.min_password_len;
        if password.chars().count() < min {
            return Err(ValidationError::PasswordTooShort { min });
        }
        if email.trim().is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        if profile.display_name.trim().is_empty() {
            return Err(ValidationError::MissingField("display_name"));
        }
        if let Some(seed) = seed {
            if seed.name.trim().is_empty() {
                return Err(ValidationError::MissingName);
            }
        }
        Ok(())
    }

    async fn load_profile(&self, uid: &UserId) -> IdentityResult<Option<User>> {
        let doc = self
            .store
            .get_document(&self.options.collections.users, uid.as_str())
            .await?;
        match doc {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Re-derive a session for a signed-in identity: cache-first fast path,
    /// then full resolution.
    ///
    /// A missing profile publishes no session but does NOT force sign-out
    /// here: sign-in events can arrive before registration has written the
    /// profile document, and tearing the provider session down from the
    /// listener would race that write. The login path is where a
    /// profile-less identity is rejected outright.
    async fn derive_session(&self, identity: &ProviderIdentity) -> IdentityResult<Option<Session>> {
        if let Some(cached) = self.cache.read() {
            if cached.user.id == identity.uid {
                debug!(user_id = %identity.uid, "session served from cache snapshot");
                return Ok(Some(cached));
            }
        }

        let Some(user) = self.load_profile(&identity.uid).await? else {
            warn!(user_id = %identity.uid, "signed-in identity has no application profile");
            return Ok(None);
        };

        let resolution = self.resolver.resolve(&user, None).await?;
        let session = Session::compose(
            user,
            resolution.tenant,
            resolution.grant,
            Provenance::Resolved,
        );
        self.cache.write(&session);
        Ok(Some(session))
    }

    async fn force_sign_out(&self, reason: &str) {
        warn!(reason, "forcing provider sign-out");
        if let Err(err) = self.provider.sign_out().await {
            warn!(error = %err, "provider sign-out failed");
        }
        self.cache.clear();
    }

    // Write-through cache plus publication, as the newest derivation.
    fn finish_session(&self, session: &Session) {
        self.cache.write(session);
        self.publish_latest(Some(session.clone()));
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn publish_latest(&self, session: Option<Session>) {
        let seq = self.next_seq();
        self.publish(seq, session);
    }

    fn publish(&self, seq: u64, session: Option<Session>) {
        let mut published = self.published_seq.lock();
        if seq < *published {
            debug!(seq, "discarding superseded session derivation");
            return;
        }
        *published = seq;
        self.sessions.send_replace(session);
    }
}
