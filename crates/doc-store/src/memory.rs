use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    Document, DocumentId, DocumentQuery, DocumentUpdate, NewDocument, Result, SortOrder,
    StoreError, Version, store::DocumentStore,
};

#[derive(Debug, Default)]
struct Collections {
    documents: HashMap<String, HashMap<DocumentId, Document>>,
    counters: HashMap<String, i64>,
}

/// In-memory document store.
///
/// Provides the same interface and atomicity guarantees as the PostgreSQL
/// implementation: every write holds the store-wide write lock, so a
/// compare-and-set can never interleave with another write. Clones share
/// the same data.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<Collections>>,
    unavailable: Arc<std::sync::RwLock<HashSet<String>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write to `collection` fail with `Unavailable` until
    /// re-enabled. Reads keep working.
    pub fn set_collection_unavailable(&self, collection: &str, unavailable: bool) {
        let mut set = self
            .unavailable
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if unavailable {
            set.insert(collection.to_string());
        } else {
            set.remove(collection);
        }
    }

    /// Returns the number of documents in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .documents
            .get(collection)
            .map_or(0, HashMap::len)
    }

    fn check_writable(&self, collection: &str) -> Result<()> {
        let set = self
            .unavailable
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if set.contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "collection {collection} is not accepting writes"
            )));
        }
        Ok(())
    }

    fn matching(inner: &Collections, query: &DocumentQuery) -> Vec<Document> {
        let mut documents: Vec<Document> = inner
            .documents
            .get(&query.collection)
            .map(|docs| {
                docs.values()
                    .filter(|d| query.matches(&d.body, d.created_at))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if query.sort == SortOrder::CreatedDesc {
            documents.reverse();
        }
        documents
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: NewDocument) -> Result<Document> {
        self.check_writable(&document.collection)?;

        let mut inner = self.inner.write().await;
        let docs = inner
            .documents
            .entry(document.collection.clone())
            .or_default();

        if docs.contains_key(&document.id) {
            return Err(StoreError::DuplicateKey {
                collection: document.collection,
                key: document.id.to_string(),
            });
        }
        if let Some(ref key) = document.key
            && docs.values().any(|d| d.key.as_ref() == Some(key))
        {
            return Err(StoreError::DuplicateKey {
                collection: document.collection,
                key: key.clone(),
            });
        }

        let stored = Document {
            collection: document.collection,
            id: document.id,
            key: document.key,
            version: Version::first(),
            created_at: document.created_at,
            updated_at: document.created_at,
            body: document.body,
        };
        docs.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(collection).and_then(|docs| {
            docs.values()
                .find(|d| d.key.as_deref() == Some(key))
                .cloned()
        }))
    }

    async fn replace(&self, update: DocumentUpdate) -> Result<Document> {
        self.check_writable(&update.collection)?;

        let mut inner = self.inner.write().await;
        let current = inner
            .documents
            .get_mut(&update.collection)
            .and_then(|docs| docs.get_mut(&update.id))
            .ok_or_else(|| StoreError::NotFound {
                collection: update.collection.clone(),
                id: update.id,
            })?;

        if current.version != update.expected_version {
            return Err(StoreError::VersionConflict {
                collection: update.collection,
                id: update.id,
                expected: update.expected_version,
                actual: current.version,
            });
        }

        current.version = current.version.next();
        current.updated_at = update.updated_at;
        current.body = update.body;
        Ok(current.clone())
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool> {
        self.check_writable(collection)?;

        let mut inner = self.inner.write().await;
        Ok(inner
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id))
            .is_some())
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let documents = Self::matching(&inner, &query);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(documents.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(Self::matching(&inner, &query).len() as u64)
    }

    async fn increment_counter(&self, name: &str) -> Result<i64> {
        let mut inner = self.inner.write().await;
        let value = inner.counters.entry(name.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DocumentStoreExt;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn new_doc(collection: &str, body: serde_json::Value) -> NewDocument {
        NewDocument::new(collection, DocumentId::new(), Utc::now(), body)
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .insert(new_doc("products", json!({"name": "Widget"})))
            .await
            .unwrap();
        assert_eq!(doc.version, Version::first());

        let fetched = store.get("products", doc.id).await.unwrap().unwrap();
        assert_eq!(fetched.body, json!({"name": "Widget"}));
        assert!(store.get("orders", doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_key_rejected_within_collection_only() {
        let store = InMemoryDocumentStore::new();
        store
            .insert(new_doc("products", json!({})).with_key("SKU-1"))
            .await
            .unwrap();

        let dup = store
            .insert(new_doc("products", json!({})).with_key("SKU-1"))
            .await;
        assert!(matches!(dup, Err(StoreError::DuplicateKey { .. })));

        store
            .insert(new_doc("orders", json!({})).with_key("SKU-1"))
            .await
            .unwrap();

        let by_key = store.get_by_key("products", "SKU-1").await.unwrap();
        assert!(by_key.is_some());
    }

    #[tokio::test]
    async fn replace_bumps_version() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .insert(new_doc("products", json!({"n": 1})))
            .await
            .unwrap();

        let updated = store
            .replace(DocumentUpdate::replacing(&doc, Utc::now(), &json!({"n": 2})).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.version, Version::new(2));
        assert_eq!(updated.body, json!({"n": 2}));
    }

    #[tokio::test]
    async fn replace_with_stale_version_conflicts() {
        let store = InMemoryDocumentStore::new();
        let doc = store
            .insert(new_doc("products", json!({"n": 1})))
            .await
            .unwrap();

        store
            .replace(DocumentUpdate::replacing(&doc, Utc::now(), &json!({"n": 2})).unwrap())
            .await
            .unwrap();

        let stale = store
            .replace(DocumentUpdate::replacing(&doc, Utc::now(), &json!({"n": 3})).unwrap())
            .await;
        assert!(matches!(
            stale,
            Err(StoreError::VersionConflict { actual, .. }) if actual == Version::new(2)
        ));

        let current = store.get_required("products", doc.id).await.unwrap();
        assert_eq!(current.body, json!({"n": 2}));
    }

    #[tokio::test]
    async fn replace_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let update = DocumentUpdate {
            collection: "products".to_string(),
            id: DocumentId::new(),
            expected_version: Version::first(),
            updated_at: Utc::now(),
            body: json!({}),
        };
        assert!(matches!(
            store.replace(update).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_paginates() {
        let store = InMemoryDocumentStore::new();
        let base = Utc::now();
        for i in 0..5 {
            let status = if i % 2 == 0 { "PENDING" } else { "SHIPPED" };
            store
                .insert(NewDocument::new(
                    "orders",
                    DocumentId::new(),
                    base + Duration::seconds(i),
                    json!({"status": status, "seq": i}),
                ))
                .await
                .unwrap();
        }

        let pending = store
            .find(DocumentQuery::collection("orders").field_eq("status", json!("PENDING")))
            .await
            .unwrap();
        let seqs: Vec<_> = pending.iter().map(|d| d.body["seq"].clone()).collect();
        assert_eq!(seqs, vec![json!(0), json!(2), json!(4)]);

        let newest = store
            .find(
                DocumentQuery::collection("orders")
                    .sort(SortOrder::CreatedDesc)
                    .offset(1)
                    .limit(2),
            )
            .await
            .unwrap();
        let seqs: Vec<_> = newest.iter().map(|d| d.body["seq"].clone()).collect();
        assert_eq!(seqs, vec![json!(3), json!(2)]);

        let count = store
            .count(
                DocumentQuery::collection("orders")
                    .created_from(base + Duration::seconds(1))
                    .created_to(base + Duration::seconds(3)),
            )
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn counters_increment_from_one() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.increment_counter("a").await.unwrap(), 1);
        assert_eq!(store.increment_counter("a").await.unwrap(), 2);
        assert_eq!(store.increment_counter("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unavailable_collection_rejects_writes() {
        let store = InMemoryDocumentStore::new();
        store.set_collection_unavailable("audit", true);

        let result = store.insert(new_doc("audit", json!({}))).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.document_count("audit").await, 0);

        store.set_collection_unavailable("audit", false);
        store.insert(new_doc("audit", json!({}))).await.unwrap();
        assert_eq!(store.document_count("audit").await, 1);
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryDocumentStore::new();
        let doc = store.insert(new_doc("users", json!({}))).await.unwrap();
        assert!(store.delete("users", doc.id).await.unwrap());
        assert!(!store.delete("users", doc.id).await.unwrap());
        assert!(!store.exists("users", doc.id).await.unwrap());
    }
}
