use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TenantId, UserId};

/// Lifecycle status of an application user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

impl UserStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Application user profile, stored in the document store keyed by the
/// provider account id. Created on registration; mutated on login and
/// tenant switch; never hard-deleted by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Remembered tenant binding. May point at a tenant that is no longer
    /// accessible; resolution treats that as a fallback trigger, not an error.
    #[serde(default)]
    pub last_tenant_id: Option<TenantId>,
    pub status: UserStatus,
}

impl User {
    /// Build a fresh profile for a newly created provider identity.
    pub fn new(id: UserId, email: impl Into<String>, profile: NewUserProfile) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: profile.display_name,
            phone: profile.phone,
            created_at: Utc::now(),
            last_login_at: None,
            last_tenant_id: None,
            status: UserStatus::Active,
        }
    }
}

/// Caller-supplied fields for a new user profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUserProfile {
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewUserProfile {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}
