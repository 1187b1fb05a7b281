use std::sync::Arc;

use caixa_core::store::QueryFilter;
use caixa_core::types::grant::grant_document_id;
use caixa_core::{AccessGrant, DocumentStore, IdentityResult, Tenant, TenantId, UserId};

use crate::documents::decode;
use crate::options::Collections;

/// Read access to per-tenant-per-user grant records and tenant ownership.
/// Pure reads; access policy lives in the resolver and the permission
/// evaluator, not here.
#[derive(Clone)]
pub struct GrantDirectory {
    store: Arc<dyn DocumentStore>,
    collections: Collections,
}

impl GrantDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, collections: Collections) -> Self {
        Self { store, collections }
    }

    /// The grant for (tenant, user), if one is recorded.
    pub async fn get_grant(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> IdentityResult<Option<AccessGrant>> {
        let doc_id = grant_document_id(tenant_id, user_id);
        let doc = self
            .store
            .get_document(&self.collections.grants, &doc_id)
            .await?;
        match doc {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Active tenants owned by the user, oldest first.
    pub async fn list_owned_tenants(&self, user_id: &UserId) -> IdentityResult<Vec<Tenant>> {
        let filters = [
            QueryFilter::eq("owner_user_id", user_id.as_str()),
            QueryFilter::eq("status", "active"),
        ];
        let docs = self
            .store
            .run_query(&self.collections.tenants, &filters)
            .await?;

        let mut tenants = docs
            .into_iter()
            .map(decode::<Tenant>)
            .collect::<IdentityResult<Vec<_>>>()?;
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tenants)
    }
}
