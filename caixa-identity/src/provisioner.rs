//! Tenant provisioning.
//!
//! The correctness-critical contract: a tenant without an owner grant, or a
//! grant referencing a nonexistent tenant, must never be observable. The two
//! records go through the document store's atomic batch, and the committed
//! tenant is re-read before success is reported, guarding against
//! eventually-consistent read-after-write anomalies.

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::{json, Value};
use tracing::{info, warn};

use caixa_core::store::WriteOp;
use caixa_core::{
    AccessGrant, DocumentStore, IdentityResult, ProvisionError, ProvisionStep, Tenant, TenantSeed,
    TenantSettings, User, ValidationError,
};

use crate::documents::encode;
use crate::options::{CategorySeed, Collections, IdentityOptions};

/// Atomically creates a tenant plus its owner grant, then seeds reference
/// data in the background.
#[derive(Clone)]
pub struct TenantProvisioner {
    store: Arc<dyn DocumentStore>,
    collections: Collections,
    default_settings: TenantSettings,
    default_categories: Vec<CategorySeed>,
}

impl TenantProvisioner {
    pub fn new(store: Arc<dyn DocumentStore>, options: &IdentityOptions) -> Self {
        Self {
            store,
            collections: options.collections.clone(),
            default_settings: options.default_settings.clone(),
            default_categories: options.default_categories.clone(),
        }
    }

    /// Create the tenant and its owner grant as one atomic unit, verify the
    /// committed tenant is readable, then kick off reference-data seeding.
    pub async fn create_tenant(&self, seed: TenantSeed, owner: &User) -> IdentityResult<Tenant> {
        if seed.name.trim().is_empty() {
            return Err(ValidationError::MissingName.into());
        }
        if owner.id.as_str().trim().is_empty() {
            return Err(ValidationError::MissingOwner.into());
        }

        let tenant = Tenant::from_seed(seed, owner.id.clone(), self.default_settings.clone());
        let grant = AccessGrant::owner(tenant.id.clone(), owner.id.clone());

        let ops = vec![
            WriteOp::Set {
                collection: self.collections.tenants.clone(),
                id: tenant.id.to_string(),
                fields: encode(&tenant)?,
            },
            WriteOp::Set {
                collection: self.collections.grants.clone(),
                id: grant.document_id(),
                fields: encode(&grant)?,
            },
        ];

        self.store.atomic_batch(ops).await.map_err(|err| {
            ProvisionError::new(ProvisionStep::Persist, err.to_string())
        })?;

        // Read-after-write guard before reporting success.
        let verified = self
            .store
            .get_document(&self.collections.tenants, tenant.id.as_str())
            .await
            .map_err(|err| ProvisionError::new(ProvisionStep::Verify, err.to_string()))?;
        if verified.is_none() {
            return Err(ProvisionError::new(
                ProvisionStep::Verify,
                "tenant not readable after commit",
            )
            .into());
        }

        info!(tenant_id = %tenant.id, owner_user_id = %owner.id, "tenant provisioned");
        self.spawn_seed(tenant.clone(), owner.clone());

        Ok(tenant)
    }

    // Seeding is independently idempotent (deterministic document ids) and
    // retryable, so a failure is logged, never unwound.
    fn spawn_seed(&self, tenant: Tenant, owner: User) {
        let store = self.store.clone();
        let collections = self.collections.clone();
        let categories = self.default_categories.clone();

        tokio::spawn(async move {
            if let Err(err) = seed_reference_data(&store, &collections, &categories, &tenant, &owner).await
            {
                warn!(
                    tenant_id = %tenant.id,
                    error = %err,
                    "reference-data seeding failed, safe to retry"
                );
            }
        });
    }
}

async fn seed_reference_data(
    store: &Arc<dyn DocumentStore>,
    collections: &Collections,
    categories: &[CategorySeed],
    tenant: &Tenant,
    owner: &User,
) -> IdentityResult<()> {
    let mut docs: Vec<(&str, String, Value)> = Vec::with_capacity(categories.len() + 1);

    for category in categories {
        docs.push((
            collections.categories.as_str(),
            format!("{}:{}", tenant.id, slug(&category.name)),
            json!({
                "tenant_id": tenant.id,
                "name": category.name,
                "kind": category.kind,
                "created_at": tenant.created_at,
            }),
        ));
    }

    // The owner opens the staff roster.
    docs.push((
        collections.staff.as_str(),
        format!("{}:{}", tenant.id, owner.id),
        json!({
            "tenant_id": tenant.id,
            "user_id": owner.id,
            "display_name": owner.display_name,
            "role": "owner",
            "created_at": tenant.created_at,
        }),
    ));

    try_join_all(
        docs.iter()
            .map(|(collection, id, fields)| store.set_document(collection, id, fields.clone())),
    )
    .await?;

    info!(tenant_id = %tenant.id, documents = docs.len(), "reference data seeded");
    Ok(())
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}
