//! Persistence of order documents.

use doc_store::{DocumentQuery, DocumentStore, NewDocument, SortOrder};

use super::model::Order;
use super::status::OrderStatus;
use crate::collections::ORDERS;
use crate::error::{DomainError, Result};
use crate::ids::{OrderId, UserId};

/// Filters for listing orders. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl OrderFilter {
    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Stores and reads order documents. The order number is the unique key.
#[derive(Clone)]
pub struct OrderRepository<S> {
    store: S,
}

impl<S: DocumentStore> OrderRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Inserts a new order.
    ///
    /// Fails with `DuplicateKey` if the order number is taken.
    pub async fn insert(&self, order: &Order) -> Result<()> {
        let document = NewDocument::from_value(ORDERS, order.id().into(), order.created_at(), order)?
            .with_key(order.order_number());
        self.store.insert(document).await?;
        Ok(())
    }

    /// Retrieves an order by id.
    pub async fn get(&self, id: OrderId) -> Result<Order> {
        self.store
            .get(ORDERS, id.into())
            .await?
            .ok_or_else(|| DomainError::not_found("order", id))?
            .into_decoded()
            .map_err(Into::into)
    }

    /// Retrieves an order by its order number.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Order> {
        self.store
            .get_by_key(ORDERS, order_number.trim())
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_number))?
            .into_decoded()
            .map_err(Into::into)
    }

    /// Lists orders matching a filter.
    pub async fn list(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut query = DocumentQuery::collection(ORDERS)
            .sort(SortOrder::CreatedDesc)
            .offset(filter.offset);
        if let Some(user_id) = filter.user_id {
            query = query.field_eq("user_id", serde_json::to_value(user_id)?);
        }
        if let Some(status) = filter.status {
            query = query.field_eq("status", serde_json::to_value(status)?);
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        self.store
            .find(query)
            .await?
            .into_iter()
            .map(|d| d.into_decoded().map_err(Into::into))
            .collect()
    }
}
