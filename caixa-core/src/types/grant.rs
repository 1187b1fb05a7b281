use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{Tenant, TenantId, UserId};

/// Role a user holds within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Member => write!(f, "member"),
        }
    }
}

/// Lifecycle status of an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Active,
    Inactive,
}

impl GrantStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Ordered set of capability strings. The `"all"` wildcard grants every
/// capability; unknown capability strings are simply absent and deny.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    /// The wildcard capability string.
    pub const WILDCARD: &'static str = "all";

    /// The full permission set: just the wildcard.
    pub fn all() -> Self {
        let mut set = BTreeSet::new();
        set.insert(Self::WILDCARD.to_string());
        Self(set)
    }

    pub fn from_capabilities<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(capabilities.into_iter().map(Into::into).collect())
    }

    /// Exact membership, wildcard not considered.
    pub fn contains(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    /// Whether this set grants the capability, via exact membership or the
    /// wildcard.
    pub fn grants(&self, capability: &str) -> bool {
        self.0.contains(capability) || self.0.contains(Self::WILDCARD)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// A record binding a user to a tenant with a role and permission set.
/// Composite key: (tenant_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub role: Role,
    pub permissions: PermissionSet,
    pub status: GrantStatus,
    pub added_at: DateTime<Utc>,
}

impl AccessGrant {
    /// Owner grant. Owners always carry the full permission set.
    pub fn owner(tenant_id: TenantId, user_id: UserId) -> Self {
        Self {
            tenant_id,
            user_id,
            role: Role::Owner,
            permissions: PermissionSet::all(),
            status: GrantStatus::Active,
            added_at: Utc::now(),
        }
    }

    /// Implicit grant for a tenant's owner when no grant record is stored.
    /// Stamped with the tenant's creation time: ownership has held since
    /// then, and repeated resolutions compose the same value.
    pub fn implicit_owner(tenant: &Tenant) -> Self {
        Self {
            tenant_id: tenant.id.clone(),
            user_id: tenant.owner_user_id.clone(),
            role: Role::Owner,
            permissions: PermissionSet::all(),
            status: GrantStatus::Active,
            added_at: tenant.created_at,
        }
    }

    /// Member grant with an explicit permission set.
    pub fn member(tenant_id: TenantId, user_id: UserId, permissions: PermissionSet) -> Self {
        Self {
            tenant_id,
            user_id,
            role: Role::Member,
            permissions,
            status: GrantStatus::Active,
            added_at: Utc::now(),
        }
    }

    /// Document id for the composite (tenant_id, user_id) key.
    pub fn document_id(&self) -> String {
        grant_document_id(&self.tenant_id, &self.user_id)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Composite document id for a grant, shared by writers and readers.
pub fn grant_document_id(tenant_id: &TenantId, user_id: &UserId) -> String {
    format!("{}:{}", tenant_id, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_grants_everything() {
        let set = PermissionSet::all();
        assert!(set.grants("reports.read"));
        assert!(set.grants("anything-at-all"));
        assert!(!set.contains("reports.read"));
    }

    #[test]
    fn member_set_grants_only_listed_capabilities() {
        let set = PermissionSet::from_capabilities(["entries.read", "entries.write"]);
        assert!(set.grants("entries.read"));
        assert!(!set.grants("staff.manage"));
    }

    #[test]
    fn owner_grant_carries_full_set() {
        let grant = AccessGrant::owner(TenantId::from("t1"), UserId::from("u1"));
        assert_eq!(grant.role, Role::Owner);
        assert_eq!(grant.permissions, PermissionSet::all());
        assert_eq!(grant.document_id(), "t1:u1");
    }
}
