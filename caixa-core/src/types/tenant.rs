use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TenantId, UserId};

/// Lifecycle status of a tenant organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
}

impl TenantStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Per-tenant presentation and locale settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
    pub currency: String,
    pub timezone: String,
    pub theme: String,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            currency: "BRL".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            theme: "light".to_string(),
        }
    }
}

/// A tenant (clinic) organization owning its own financial records.
///
/// Created only via the tenant provisioner; `owner_user_id` is fixed at
/// creation and never reassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub owner_user_id: UserId,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub settings: TenantSettings,
}

impl Tenant {
    /// Materialize a tenant record from caller-supplied seed fields.
    pub fn from_seed(seed: TenantSeed, owner_user_id: UserId, defaults: TenantSettings) -> Self {
        let now = Utc::now();
        Self {
            id: TenantId::new(),
            name: seed.name,
            tax_id: seed.tax_id,
            address: seed.address,
            phone: seed.phone,
            email: seed.email,
            owner_user_id,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
            settings: seed.settings.unwrap_or(defaults),
        }
    }
}

/// Caller-supplied fields for a new tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantSeed {
    pub name: String,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub settings: Option<TenantSettings>,
}

impl TenantSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
