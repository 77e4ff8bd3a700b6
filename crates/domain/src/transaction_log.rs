//! Append-only audit trail of stock movements.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use doc_store::{DocumentQuery, DocumentStore, NewDocument, SortOrder};
use serde::{Deserialize, Serialize};

use crate::collections::INVENTORY_TRANSACTIONS;
use crate::error::{DomainError, Result};
use crate::ids::{OrderId, ProductId, TransactionId};

/// Reason for a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Purchase,
    Sale,
    Return,
    Adjustment,
    Damaged,
    Restock,
}

impl TransactionType {
    /// Returns the type name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "PURCHASE",
            TransactionType::Sale => "SALE",
            TransactionType::Return => "RETURN",
            TransactionType::Adjustment => "ADJUSTMENT",
            TransactionType::Damaged => "DAMAGED",
            TransactionType::Restock => "RESTOCK",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PURCHASE" => Ok(TransactionType::Purchase),
            "SALE" => Ok(TransactionType::Sale),
            "RETURN" => Ok(TransactionType::Return),
            "ADJUSTMENT" => Ok(TransactionType::Adjustment),
            "DAMAGED" => Ok(TransactionType::Damaged),
            "RESTOCK" => Ok(TransactionType::Restock),
            other => Err(DomainError::validation(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

/// One immutable record of a stock movement.
///
/// `quantity` is the signed change of the product's available units;
/// `quantity_before` and `quantity_after` are available units around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: TransactionId,
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Count and net quantity of one transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TypeTotals {
    pub count: u64,
    pub net_quantity: i64,
}

/// Per-type roll-up of a product's transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub product_id: ProductId,
    pub by_type: BTreeMap<TransactionType, TypeTotals>,
    pub net_change: i64,
}

/// Writes and reads inventory transaction records.
#[derive(Clone)]
pub struct TransactionLog<S> {
    store: S,
}

impl<S: DocumentStore> TransactionLog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Appends a record. Records are never updated or deleted.
    pub async fn append(&self, transaction: &InventoryTransaction) -> Result<()> {
        let document = NewDocument::from_value(
            INVENTORY_TRANSACTIONS,
            transaction.id.into(),
            transaction.created_at,
            transaction,
        )?;
        self.store.insert(document).await?;
        Ok(())
    }

    /// Returns a product's records, newest first.
    pub async fn for_product(
        &self,
        product_id: ProductId,
        limit: Option<usize>,
    ) -> Result<Vec<InventoryTransaction>> {
        let mut query = DocumentQuery::collection(INVENTORY_TRANSACTIONS)
            .field_eq("product_id", serde_json::to_value(product_id)?)
            .sort(SortOrder::CreatedDesc);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        self.fetch(query).await
    }

    /// Returns every record of one type, newest first.
    pub async fn by_type(&self, kind: TransactionType) -> Result<Vec<InventoryTransaction>> {
        let query = DocumentQuery::collection(INVENTORY_TRANSACTIONS)
            .field_eq("type", serde_json::to_value(kind)?)
            .sort(SortOrder::CreatedDesc);
        self.fetch(query).await
    }

    /// Returns records created in the inclusive range, oldest first.
    pub async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<InventoryTransaction>> {
        if from > to {
            return Err(DomainError::validation(format!(
                "range start {from} is after range end {to}"
            )));
        }
        let query = DocumentQuery::collection(INVENTORY_TRANSACTIONS)
            .created_from(from)
            .created_to(to)
            .sort(SortOrder::CreatedAsc);
        self.fetch(query).await
    }

    /// Returns the records written on behalf of an order, oldest first.
    pub async fn for_order(&self, order_id: OrderId) -> Result<Vec<InventoryTransaction>> {
        let query = DocumentQuery::collection(INVENTORY_TRANSACTIONS)
            .field_eq("order_id", serde_json::to_value(order_id)?)
            .sort(SortOrder::CreatedAsc);
        self.fetch(query).await
    }

    /// Rolls up a product's records by type.
    pub async fn summary(&self, product_id: ProductId) -> Result<TransactionSummary> {
        let records = self.for_product(product_id, None).await?;

        let mut by_type: BTreeMap<TransactionType, TypeTotals> = BTreeMap::new();
        let mut net_change = 0;
        for record in &records {
            let totals = by_type.entry(record.kind).or_default();
            totals.count += 1;
            totals.net_quantity += record.quantity;
            net_change += record.quantity;
        }

        Ok(TransactionSummary {
            product_id,
            by_type,
            net_change,
        })
    }

    async fn fetch(&self, query: DocumentQuery) -> Result<Vec<InventoryTransaction>> {
        self.store
            .find(query)
            .await?
            .into_iter()
            .map(|d| d.into_decoded().map_err(Into::into))
            .collect()
    }
}
