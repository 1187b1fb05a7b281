// Identity engine options and configuration.

use serde::{Deserialize, Serialize};

use caixa_core::{TenantSettings, ValidationError};

/// Document collection names used by the identity core.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collections {
    pub users: String,
    pub tenants: String,
    pub grants: String,
    pub categories: String,
    pub staff: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            tenants: "tenants".to_string(),
            grants: "access_grants".to_string(),
            categories: "categories".to_string(),
            staff: "staff".to_string(),
        }
    }
}

impl Collections {
    fn validate(&self) -> Result<(), ValidationError> {
        let names: [(&'static str, &str); 5] = [
            ("collections.users", &self.users),
            ("collections.tenants", &self.tenants),
            ("collections.grants", &self.grants),
            ("collections.categories", &self.categories),
            ("collections.staff", &self.staff),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// Ledger category kind seeded into new tenants.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Revenue,
    Expense,
}

/// A reference category seeded into every new tenant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySeed {
    pub name: String,
    pub kind: CategoryKind,
}

impl CategorySeed {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Main identity engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IdentityOptions {
    pub collections: Collections,
    /// Local-cache key holding the single-slot session snapshot.
    pub cache_key: String,
    /// Minimum password length accepted at registration.
    pub min_password_len: usize,
    /// Settings applied to tenants whose seed carries none.
    pub default_settings: TenantSettings,
    /// Reference categories seeded into every new tenant.
    pub default_categories: Vec<CategorySeed>,
}

impl Default for IdentityOptions {
    fn default() -> Self {
        Self {
            collections: Collections::default(),
            cache_key: "caixa.session".to_string(),
            min_password_len: 6,
            default_settings: TenantSettings::default(),
            default_categories: default_categories(),
        }
    }
}

impl IdentityOptions {
    /// Validate the configuration before the engine starts using it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.collections.validate()?;
        if self.cache_key.trim().is_empty() {
            return Err(ValidationError::MissingField("cache_key"));
        }
        Ok(())
    }
}

fn default_categories() -> Vec<CategorySeed> {
    vec![
        CategorySeed::new("Consultations", CategoryKind::Revenue),
        CategorySeed::new("Procedures", CategoryKind::Revenue),
        CategorySeed::new("Product sales", CategoryKind::Revenue),
        CategorySeed::new("Rent", CategoryKind::Expense),
        CategorySeed::new("Salaries", CategoryKind::Expense),
        CategorySeed::new("Supplies", CategoryKind::Expense),
        CategorySeed::new("Utilities", CategoryKind::Expense),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(IdentityOptions::default().validate().is_ok());
    }

    #[test]
    fn blank_collection_name_is_rejected() {
        let mut options = IdentityOptions::default();
        options.collections.grants = "  ".to_string();
        assert!(options.validate().is_err());
    }

    #[test]
    fn blank_cache_key_is_rejected() {
        let mut options = IdentityOptions::default();
        options.cache_key = String::new();
        assert_eq!(
            options.validate(),
            Err(ValidationError::MissingField("cache_key"))
        );
    }
}
