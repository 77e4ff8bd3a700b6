//! The stock ledger: every change to a product's stock counters.
//!
//! Each operation is one optimistic read-modify-write of the product
//! document. The precondition (enough available stock, enough reserved
//! stock, non-negative quantity) is evaluated on the exact version that is
//! written back, so concurrent reservations can never oversell.

use chrono::{DateTime, Utc};
use common::SharedClock;
use doc_store::DocumentStore;

use crate::collections::PRODUCTS;
use crate::error::{DomainError, Result};
use crate::ids::{OrderId, ProductId, TransactionId};
use crate::money::Money;
use crate::persistence::{Updated, update_with_retry};
use crate::product::{Inventory, InventoryStatus, Product};
use crate::settings::{AuditPolicy, LedgerSettings};
use crate::transaction_log::{InventoryTransaction, TransactionLog, TransactionType};

/// Audit context recorded with a stock movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub kind: TransactionType,
    pub order_id: Option<OrderId>,
    pub notes: Option<String>,
    pub performed_by: Option<String>,
}

impl LedgerEntry {
    pub fn new(kind: TransactionType) -> Self {
        Self {
            kind,
            order_id: None,
            notes: None,
            performed_by: None,
        }
    }

    /// Links the movement to an order.
    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn performed_by(mut self, who: Option<String>) -> Self {
        self.performed_by = who;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum StockChange {
    Adjust(i64),
    Reserve(u32),
    Release(u32),
}

impl StockChange {
    fn apply(self, product: &mut Product) -> Result<()> {
        match self {
            StockChange::Adjust(delta) => product.adjust_quantity(delta),
            StockChange::Reserve(quantity) => product.reserve(quantity),
            StockChange::Release(quantity) => product.release(quantity),
        }
    }

    fn inverse(self) -> Self {
        match self {
            StockChange::Adjust(delta) => StockChange::Adjust(-delta),
            StockChange::Reserve(quantity) => StockChange::Release(quantity),
            StockChange::Release(quantity) => StockChange::Reserve(quantity),
        }
    }

    fn name(self) -> &'static str {
        match self {
            StockChange::Adjust(_) => "adjust",
            StockChange::Reserve(_) => "reserve",
            StockChange::Release(_) => "release",
        }
    }
}

/// Mutates product stock counters and records each movement in the
/// [`TransactionLog`].
#[derive(Clone)]
pub struct StockLedger<S> {
    store: S,
    log: TransactionLog<S>,
    clock: SharedClock,
    settings: LedgerSettings,
}

impl<S: DocumentStore + Clone> StockLedger<S> {
    pub fn new(store: S, clock: SharedClock, settings: LedgerSettings) -> Self {
        Self {
            log: TransactionLog::new(store.clone()),
            store,
            clock,
            settings,
        }
    }

    /// Returns the transaction log this ledger appends to.
    pub fn log(&self) -> &TransactionLog<S> {
        &self.log
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Returns the current stock counters of a product.
    pub async fn levels(&self, product_id: ProductId) -> Result<Inventory> {
        let product: Product = self
            .store
            .get(PRODUCTS, product_id.into())
            .await?
            .ok_or_else(|| DomainError::not_found("product", product_id))?
            .into_decoded()?;
        Ok(product.inventory().clone())
    }

    /// Changes the on-hand quantity by `delta`.
    ///
    /// Fails with a validation error if the result would be negative or
    /// below the reserved count.
    #[tracing::instrument(skip(self, entry), fields(kind = %entry.kind))]
    pub async fn adjust(
        &self,
        product_id: ProductId,
        delta: i64,
        entry: LedgerEntry,
    ) -> Result<Product> {
        if delta == 0 {
            return Err(DomainError::validation("adjustment delta must not be zero"));
        }
        self.apply(
            product_id,
            StockChange::Adjust(delta),
            entry,
            self.settings.audit_policy,
        )
        .await
    }

    /// Reserves `quantity` units for an order.
    ///
    /// Fails with `InsufficientStock` without mutating anything when fewer
    /// than `quantity` units are available.
    #[tracing::instrument(skip(self, entry))]
    pub async fn reserve(
        &self,
        product_id: ProductId,
        quantity: u32,
        entry: LedgerEntry,
    ) -> Result<Product> {
        if quantity == 0 {
            return Err(DomainError::validation("reservation quantity must be positive"));
        }
        match self
            .apply(
                product_id,
                StockChange::Reserve(quantity),
                entry,
                self.settings.audit_policy,
            )
            .await
        {
            Ok(product) => {
                metrics::counter!("inventory_reservations_total").increment(1);
                Ok(product)
            }
            Err(err @ DomainError::InsufficientStock { .. }) => {
                metrics::counter!("inventory_reservation_rejections_total").increment(1);
                tracing::info!(%product_id, requested = quantity, "reservation rejected: {err}");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Returns `quantity` reserved units to available stock.
    #[tracing::instrument(skip(self, entry))]
    pub async fn release(
        &self,
        product_id: ProductId,
        quantity: u32,
        entry: LedgerEntry,
    ) -> Result<Product> {
        self.release_with_policy(product_id, quantity, entry, self.settings.audit_policy)
            .await
    }

    /// Like [`StockLedger::release`], with an explicit audit policy.
    ///
    /// Rollback paths pass [`AuditPolicy::BestEffort`] so that returning
    /// stock never depends on the audit log being writable.
    pub async fn release_with_policy(
        &self,
        product_id: ProductId,
        quantity: u32,
        entry: LedgerEntry,
        policy: AuditPolicy,
    ) -> Result<Product> {
        if quantity == 0 {
            return Err(DomainError::validation("release quantity must be positive"));
        }
        let product = self
            .apply(product_id, StockChange::Release(quantity), entry, policy)
            .await?;
        metrics::counter!("inventory_releases_total").increment(1);
        Ok(product)
    }

    /// Adds a sale to the product's sales statistics.
    #[tracing::instrument(skip(self))]
    pub async fn record_sale(
        &self,
        product_id: ProductId,
        quantity: u32,
        revenue: Money,
        sold_at: DateTime<Utc>,
    ) -> Result<Product> {
        let Updated { after, .. } = self
            .update(product_id, move |product: &mut Product, _| {
                product.accrue_sale(quantity, revenue, sold_at)
            })
            .await?;
        Ok(after)
    }

    /// Marks a product DISCONTINUED or COMING_SOON, or with `None` returns it
    /// to the status derived from its stock.
    #[tracing::instrument(skip(self))]
    pub async fn set_availability(
        &self,
        product_id: ProductId,
        status: Option<InventoryStatus>,
    ) -> Result<Product> {
        let Updated { after, .. } = self
            .update(product_id, move |product: &mut Product, _| {
                product.set_status(status)
            })
            .await?;
        tracing::info!(%product_id, status = %after.inventory().status(), "availability updated");
        Ok(after)
    }

    async fn update<F>(&self, product_id: ProductId, mut change: F) -> Result<Updated<Product>>
    where
        F: FnMut(&mut Product, DateTime<Utc>) -> Result<()> + Send,
    {
        update_with_retry(
            &self.store,
            self.clock.as_ref(),
            PRODUCTS,
            "product",
            product_id.into(),
            self.settings.max_write_attempts,
            move |product: &mut Product, now| {
                change(product, now)?;
                product.touch(now);
                Ok(())
            },
        )
        .await
    }

    async fn apply(
        &self,
        product_id: ProductId,
        change: StockChange,
        entry: LedgerEntry,
        policy: AuditPolicy,
    ) -> Result<Product> {
        let Updated { before, after } = self
            .update(product_id, move |product: &mut Product, _| change.apply(product))
            .await?;

        let available_before = before.inventory().available();
        let available_after = after.inventory().available();
        let record = InventoryTransaction {
            id: TransactionId::new(),
            product_id,
            kind: entry.kind,
            quantity: available_after - available_before,
            quantity_before: available_before,
            quantity_after: available_after,
            order_id: entry.order_id,
            notes: entry.notes,
            performed_by: entry.performed_by,
            created_at: after.updated_at(),
        };

        let Err(err) = self.log.append(&record).await else {
            tracing::debug!(
                %product_id,
                operation = change.name(),
                available = available_after,
                "stock updated"
            );
            return Ok(after);
        };

        metrics::counter!("inventory_audit_failures_total").increment(1);
        match policy {
            AuditPolicy::BestEffort => {
                tracing::warn!(
                    %product_id,
                    operation = change.name(),
                    error = %err,
                    "failed to record inventory transaction, keeping stock change"
                );
                Ok(after)
            }
            AuditPolicy::FailClosed => {
                tracing::error!(
                    %product_id,
                    operation = change.name(),
                    error = %err,
                    "failed to record inventory transaction, undoing stock change"
                );
                let undo = change.inverse();
                match self
                    .update(product_id, move |product: &mut Product, _| undo.apply(product))
                    .await
                {
                    Ok(_) => Err(DomainError::AuditFailed {
                        product_id,
                        operation: change.name(),
                        reason: err.to_string(),
                    }),
                    Err(undo_err) => {
                        metrics::counter!("inventory_audit_undo_failures_total").increment(1);
                        tracing::error!(
                            %product_id,
                            operation = change.name(),
                            error = %undo_err,
                            "failed to undo stock change, change stays applied without a record"
                        );
                        Err(DomainError::AuditUndoFailed {
                            product_id,
                            operation: change.name(),
                            reason: err.to_string(),
                            undo_error: undo_err.to_string(),
                        })
                    }
                }
            }
        }
    }
}
