//! Tenant resolution: which tenant (and grant) a session applies to.
//!
//! Resolution degrades through broader search rather than failing because a
//! remembered binding went stale, in strict order:
//!
//! 1. An explicit tenant id must be accessible or the call fails
//!    `AccessDenied`.
//! 2. The user's remembered `last_tenant_id`, if still accessible.
//! 3. The oldest active tenant the user owns, or no binding at all.

use std::sync::Arc;

use tracing::debug;

use caixa_core::{
    AccessGrant, DocumentStore, IdentityError, IdentityResult, Tenant, TenantId, User, UserId,
};

use crate::documents::decode;
use crate::grants::GrantDirectory;
use crate::options::Collections;

/// Outcome of tenant resolution: a tenant and the grant that admits the
/// user, or neither. A tenant-less resolution is a valid terminal state,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub tenant: Option<Tenant>,
    pub grant: Option<AccessGrant>,
}

impl Resolution {
    pub fn none() -> Self {
        Self {
            tenant: None,
            grant: None,
        }
    }

    pub fn bound(tenant: Tenant, grant: AccessGrant) -> Self {
        Self {
            tenant: Some(tenant),
            grant: Some(grant),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.tenant.is_some()
    }
}

/// Applies the ordered fallback policy selecting the active tenant + grant.
#[derive(Clone)]
pub struct TenantResolver {
    store: Arc<dyn DocumentStore>,
    grants: GrantDirectory,
    collections: Collections,
}

impl TenantResolver {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        grants: GrantDirectory,
        collections: Collections,
    ) -> Self {
        Self {
            store,
            grants,
            collections,
        }
    }

    /// Resolve the active tenant for `user`, honoring an explicit request
    /// first, then the remembered binding, then ownership.
    pub async fn resolve(
        &self,
        user: &User,
        explicit: Option<&TenantId>,
    ) -> IdentityResult<Resolution> {
        if let Some(tenant_id) = explicit {
            return match self.check_access(tenant_id, &user.id).await? {
                Some((tenant, grant)) => Ok(Resolution::bound(tenant, grant)),
                None => Err(IdentityError::AccessDenied {
                    tenant_id: tenant_id.clone(),
                }),
            };
        }

        if let Some(last) = &user.last_tenant_id {
            if let Some((tenant, grant)) = self.check_access(last, &user.id).await? {
                debug!(tenant_id = %tenant.id, user_id = %user.id, "resolved remembered tenant");
                return Ok(Resolution::bound(tenant, grant));
            }
            debug!(
                tenant_id = %last,
                user_id = %user.id,
                "remembered tenant no longer accessible, falling back to owned tenants"
            );
        }

        let owned = self.grants.list_owned_tenants(&user.id).await?;
        match owned.into_iter().next() {
            Some(tenant) => {
                let grant = self
                    .grants
                    .get_grant(&tenant.id, &user.id)
                    .await?
                    .filter(AccessGrant::is_active)
                    .unwrap_or_else(|| AccessGrant::implicit_owner(&tenant));
                debug!(tenant_id = %tenant.id, user_id = %user.id, "resolved oldest owned tenant");
                Ok(Resolution::bound(tenant, grant))
            }
            None => {
                debug!(user_id = %user.id, "user holds no active tenant");
                Ok(Resolution::none())
            }
        }
    }

    /// Acceptance check shared by the explicit and remembered steps: the
    /// tenant must exist and be active, and the user must hold an active
    /// grant on it or own it (owners get an implicit full grant).
    async fn check_access(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> IdentityResult<Option<(Tenant, AccessGrant)>> {
        let (tenant, grant) = tokio::try_join!(
            self.load_tenant(tenant_id),
            self.grants.get_grant(tenant_id, user_id),
        )?;

        let Some(tenant) = tenant else {
            return Ok(None);
        };
        if !tenant.status.is_active() {
            return Ok(None);
        }

        match grant.filter(AccessGrant::is_active) {
            Some(grant) => Ok(Some((tenant, grant))),
            None if tenant.owner_user_id == *user_id => {
                let grant = AccessGrant::implicit_owner(&tenant);
                Ok(Some((tenant, grant)))
            }
            None => Ok(None),
        }
    }

    async fn load_tenant(&self, tenant_id: &TenantId) -> IdentityResult<Option<Tenant>> {
        let doc = self
            .store
            .get_document(&self.collections.tenants, tenant_id.as_str())
            .await?;
        match doc {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }
}
