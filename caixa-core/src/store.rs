//! Document-store collaborator seam.
//!
//! Records are `serde_json::Value` documents grouped into named collections,
//! the shape the backing store actually speaks; domain types serialize
//! to/from documents at the call sites that own them.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;

/// Result type for document-store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Equality filter for document queries. Equality is the only comparison the
/// identity core needs.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub field: String,
    pub equals: Value,
}

impl QueryFilter {
    pub fn eq(field: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: equals.into(),
        }
    }
}

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace (or create) the whole document.
    Set {
        collection: String,
        id: String,
        fields: Value,
    },
    /// Merge partial fields into the document, creating it if absent.
    Update {
        collection: String,
        id: String,
        partial: Value,
    },
}

/// External structured-record store holding users, tenants, and grants.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` if missing.
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Replace (or create) one document.
    async fn set_document(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()>;

    /// Merge partial fields into one document, creating it if absent.
    async fn update_fields(&self, collection: &str, id: &str, partial: Value) -> StoreResult<()>;

    /// All documents in a collection matching every equality filter.
    async fn run_query(&self, collection: &str, filters: &[QueryFilter])
        -> StoreResult<Vec<Value>>;

    /// Commit all operations or none of them. A failed batch must leave no
    /// operation observable.
    async fn atomic_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()>;
}
