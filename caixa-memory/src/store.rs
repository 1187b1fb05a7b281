use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use caixa_core::store::{DocumentStore, QueryFilter, StoreResult, WriteOp};
use caixa_core::StoreError;

// collection name -> document id -> document
type Collections = HashMap<String, HashMap<String, Value>>;

/// In-memory document store for testing and development.
///
/// Batches stage under a single write lock and apply only after the whole
/// batch is accepted, so an interrupted batch leaves nothing observable.
pub struct MemoryDirectory {
    collections: Arc<RwLock<Collections>>,
    fail_next_batch: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            fail_next_batch: AtomicBool::new(false),
        }
    }

    /// Make the next `atomic_batch` fail before committing anything.
    /// Test support for atomicity properties.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    /// Number of documents currently in a collection. Test support.
    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_into(target: &mut Value, partial: Value) {
    match (target, partial) {
        (Value::Object(target_map), Value::Object(partial_map)) => {
            for (key, value) in partial_map {
                target_map.insert(key, value);
            }
        }
        (target, partial) => *target = partial,
    }
}

fn matches_filters(doc: &Value, filters: &[QueryFilter]) -> bool {
    filters
        .iter()
        .all(|filter| doc.get(&filter.field) == Some(&filter.equals))
}

#[async_trait]
impl DocumentStore for MemoryDirectory {
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Value) -> StoreResult<()> {
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn update_fields(&self, collection: &str, id: &str, partial: Value) -> StoreResult<()> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(id) {
            Some(doc) => merge_into(doc, partial),
            None => {
                docs.insert(id.to_string(), partial);
            }
        }
        Ok(())
    }

    async fn run_query(
        &self,
        collection: &str,
        filters: &[QueryFilter],
    ) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read();
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| matches_filters(doc, filters))
            .cloned()
            .collect())
    }

    async fn atomic_batch(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        // One write lock for the whole batch; apply only after the
        // injected-failure gate so a failed batch commits nothing.
        let mut collections = self.collections.write();

        if self.fail_next_batch.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected batch failure".to_string(),
            ));
        }

        for op in ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    fields,
                } => {
                    collections.entry(collection).or_default().insert(id, fields);
                }
                WriteOp::Update {
                    collection,
                    id,
                    partial,
                } => {
                    let docs = collections.entry(collection).or_default();
                    match docs.get_mut(&id) {
                        Some(doc) => merge_into(doc, partial),
                        None => {
                            docs.insert(id, partial);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = MemoryDirectory::new();
        store
            .set_document("users", "u1", json!({"name": "Ana"}))
            .await
            .unwrap();

        let doc = store.get_document("users", "u1").await.unwrap();
        assert_eq!(doc, Some(json!({"name": "Ana"})));
        assert_eq!(store.get_document("users", "u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_merges_partial_fields() {
        let store = MemoryDirectory::new();
        store
            .set_document("users", "u1", json!({"name": "Ana", "phone": "1"}))
            .await
            .unwrap();
        store
            .update_fields("users", "u1", json!({"phone": "2", "email": "a@x.com"}))
            .await
            .unwrap();

        let doc = store.get_document("users", "u1").await.unwrap().unwrap();
        assert_eq!(
            doc,
            json!({"name": "Ana", "phone": "2", "email": "a@x.com"})
        );
    }

    #[tokio::test]
    async fn query_applies_all_equality_filters() {
        let store = MemoryDirectory::new();
        store
            .set_document("tenants", "t1", json!({"owner": "u1", "status": "active"}))
            .await
            .unwrap();
        store
            .set_document("tenants", "t2", json!({"owner": "u1", "status": "inactive"}))
            .await
            .unwrap();
        store
            .set_document("tenants", "t3", json!({"owner": "u2", "status": "active"}))
            .await
            .unwrap();

        let filters = [
            QueryFilter::eq("owner", "u1"),
            QueryFilter::eq("status", "active"),
        ];
        let results = store.run_query("tenants", &filters).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["owner"], "u1");
    }

    #[tokio::test]
    async fn committed_batch_applies_every_op() {
        let store = MemoryDirectory::new();
        store
            .atomic_batch(vec![
                WriteOp::Set {
                    collection: "tenants".to_string(),
                    id: "t1".to_string(),
                    fields: json!({"name": "Clinica A"}),
                },
                WriteOp::Set {
                    collection: "access_grants".to_string(),
                    id: "t1:u1".to_string(),
                    fields: json!({"role": "owner"}),
                },
            ])
            .await
            .unwrap();

        assert!(store.get_document("tenants", "t1").await.unwrap().is_some());
        assert!(store
            .get_document("access_grants", "t1:u1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn failed_batch_leaves_nothing_observable() {
        let store = MemoryDirectory::new();
        store.fail_next_batch();

        let result = store
            .atomic_batch(vec![
                WriteOp::Set {
                    collection: "tenants".to_string(),
                    id: "t1".to_string(),
                    fields: json!({"name": "Clinica A"}),
                },
                WriteOp::Set {
                    collection: "access_grants".to_string(),
                    id: "t1:u1".to_string(),
                    fields: json!({"role": "owner"}),
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.document_count("tenants"), 0);
        assert_eq!(store.document_count("access_grants"), 0);

        // the failure gate is one-shot
        store
            .atomic_batch(vec![WriteOp::Set {
                collection: "tenants".to_string(),
                id: "t1".to_string(),
                fields: json!({"name": "Clinica A"}),
            }])
            .await
            .unwrap();
        assert_eq!(store.document_count("tenants"), 1);
    }
}
