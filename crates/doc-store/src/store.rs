use async_trait::async_trait;

use crate::{
    Document, DocumentId, DocumentQuery, DocumentUpdate, NewDocument, Result, StoreError,
};

/// Core trait for document store implementations.
///
/// A document store persists JSON documents grouped in collections. The only
/// write primitive that may race is [`DocumentStore::replace`], which is an
/// atomic compare-and-set on the document version: the read predicate and the
/// write are indivisible inside the backend.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document at version 1.
    ///
    /// Fails with `DuplicateKey` if the id or the unique key is already used
    /// in the collection.
    async fn insert(&self, document: NewDocument) -> Result<Document>;

    /// Retrieves a document by id.
    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    /// Retrieves a document by its unique key.
    async fn get_by_key(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Replaces a document body if its version still equals
    /// `update.expected_version`.
    ///
    /// Returns the stored document at the incremented version. Fails with
    /// `VersionConflict` if another write landed first and `NotFound` if the
    /// document does not exist.
    async fn replace(&self, update: DocumentUpdate) -> Result<Document>;

    /// Deletes a document. Returns false if it did not exist.
    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool>;

    /// Retrieves documents matching a query.
    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Counts documents matching a query (limit and offset are ignored).
    async fn count(&self, query: DocumentQuery) -> Result<u64>;

    /// Atomically increments a named counter and returns the new value.
    ///
    /// The first increment of a counter returns 1.
    async fn increment_counter(&self, name: &str) -> Result<i64>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Retrieves a document, failing with `NotFound` if it does not exist.
    async fn get_required(&self, collection: &str, id: DocumentId) -> Result<Document> {
        self.get(collection, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id,
            })
    }

    /// Checks whether a document exists.
    async fn exists(&self, collection: &str, id: DocumentId) -> Result<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
