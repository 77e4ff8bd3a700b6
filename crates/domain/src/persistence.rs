//! Optimistic read-modify-write over a single document.

use common::{Clock, DocumentId};
use chrono::{DateTime, Utc};
use doc_store::{DocumentStore, DocumentUpdate, StoreError};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DomainError, Result};

/// Body of a document before and after a successful update.
pub(crate) struct Updated<T> {
    pub before: T,
    pub after: T,
}

/// Loads a document, applies `change` and writes it back with a
/// compare-and-set on the version that was read.
///
/// A version conflict re-reads and re-runs `change`, so any precondition
/// checked inside it always holds for the version that gets written. An
/// error returned by `change` aborts without writing.
pub(crate) async fn update_with_retry<S, T, F>(
    store: &S,
    clock: &dyn Clock,
    collection: &str,
    entity: &'static str,
    id: DocumentId,
    max_attempts: u32,
    mut change: F,
) -> Result<Updated<T>>
where
    S: DocumentStore + ?Sized,
    T: Serialize + DeserializeOwned + Clone + Send,
    F: FnMut(&mut T, DateTime<Utc>) -> Result<()> + Send,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        let document = store
            .get(collection, id)
            .await?
            .ok_or_else(|| DomainError::not_found(entity, id))?;

        let before: T = document.decode()?;
        let mut after = before.clone();
        let now = clock.now();
        change(&mut after, now)?;

        let update = DocumentUpdate::replacing(&document, now, &after)?;
        match store.replace(update).await {
            Ok(_) => return Ok(Updated { before, after }),
            Err(StoreError::VersionConflict { .. }) => {
                metrics::counter!("inventory_write_conflicts_total", "collection" => collection.to_string())
                    .increment(1);
                tracing::debug!(%id, entity, attempt, "version conflict, retrying");
                tokio::task::yield_now().await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(%id, entity, attempts, "giving up after repeated version conflicts");
    Err(DomainError::Contention {
        entity,
        id: id.to_string(),
        attempts,
    })
}
