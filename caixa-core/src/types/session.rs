use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccessGrant, PermissionSet, Role, Tenant, TenantId, User};

/// Where a composed session came from.
///
/// Cached sessions are a fast path at process start; their permissions may be
/// stale relative to the access-grant store until the next full resolution.
/// Callers performing sensitive actions should check this before trusting
/// the embedded permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Cache,
    Resolved,
}

/// The composed, cacheable result of authentication + tenant resolution +
/// permissions. `tenant = None` is a valid terminal state (the user holds no
/// active tenant), not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub tenant: Option<Tenant>,
    pub grant: Option<AccessGrant>,
    pub composed_at: DateTime<Utc>,
    pub provenance: Provenance,
}

impl Session {
    /// Compose a session from its parts, stamped now.
    pub fn compose(
        user: User,
        tenant: Option<Tenant>,
        grant: Option<AccessGrant>,
        provenance: Provenance,
    ) -> Self {
        Self {
            user,
            tenant,
            grant,
            composed_at: Utc::now(),
            provenance,
        }
    }

    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant.as_ref().map(|t| &t.id)
    }

    pub fn role(&self) -> Option<Role> {
        self.grant.as_ref().map(|g| g.role)
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.grant.as_ref().map(|g| &g.permissions)
    }

    pub fn is_from_cache(&self) -> bool {
        matches!(self.provenance, Provenance::Cache)
    }
}
