//! Products and their stock counters.

use chrono::{DateTime, Utc};
use common::SharedClock;
use doc_store::{DocumentQuery, DocumentStore, NewDocument, SortOrder};
use serde::{Deserialize, Serialize};

use crate::collections::PRODUCTS;
use crate::error::{DomainError, Result};
use crate::ids::ProductId;
use crate::money::Money;

/// Sellability of a product.
///
/// `Available` and `OutOfStock` are derived from the counters after every
/// ledger mutation. `Discontinued` and `ComingSoon` are set explicitly and
/// stay until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    #[default]
    Available,
    OutOfStock,
    Discontinued,
    ComingSoon,
}

impl InventoryStatus {
    /// Returns true for statuses that ledger mutations leave untouched.
    pub fn is_manual(&self) -> bool {
        matches!(self, InventoryStatus::Discontinued | InventoryStatus::ComingSoon)
    }

    /// Returns the status name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::Available => "AVAILABLE",
            InventoryStatus::OutOfStock => "OUT_OF_STOCK",
            InventoryStatus::Discontinued => "DISCONTINUED",
            InventoryStatus::ComingSoon => "COMING_SOON",
        }
    }
}

impl std::fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InventoryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "AVAILABLE" => Ok(InventoryStatus::Available),
            "OUT_OF_STOCK" => Ok(InventoryStatus::OutOfStock),
            "DISCONTINUED" => Ok(InventoryStatus::Discontinued),
            "COMING_SOON" => Ok(InventoryStatus::ComingSoon),
            other => Err(DomainError::validation(format!(
                "unknown inventory status '{other}'"
            ))),
        }
    }
}

/// Stock counters of a product.
///
/// `available` is stored alongside `quantity` and `reserved` and is always
/// written as `quantity - reserved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    quantity: i64,
    reserved: i64,
    available: i64,
    reorder_point: i64,
    reorder_quantity: i64,
    status: InventoryStatus,
}

impl Inventory {
    /// Creates counters for a product with `quantity` units on hand.
    pub fn new(quantity: u32, reorder_point: u32, reorder_quantity: u32) -> Self {
        let mut inventory = Self {
            quantity: i64::from(quantity),
            reserved: 0,
            available: 0,
            reorder_point: i64::from(reorder_point),
            reorder_quantity: i64::from(reorder_quantity),
            status: InventoryStatus::Available,
        };
        inventory.recompute();
        inventory
    }

    /// Units physically on hand.
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Units held for placed orders.
    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    /// Units that can still be reserved.
    pub fn available(&self) -> i64 {
        self.available
    }

    pub fn reorder_point(&self) -> i64 {
        self.reorder_point
    }

    pub fn reorder_quantity(&self) -> i64 {
        self.reorder_quantity
    }

    pub fn status(&self) -> InventoryStatus {
        self.status
    }

    /// Returns true once `available` has dropped to the reorder point.
    pub fn needs_reorder(&self) -> bool {
        self.available <= self.reorder_point
    }

    fn recompute(&mut self) {
        self.available = self.quantity - self.reserved;
        if !self.status.is_manual() {
            self.status = if self.available <= 0 {
                InventoryStatus::OutOfStock
            } else {
                InventoryStatus::Available
            };
        }
    }
}

/// Lifetime sales figures of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SalesStats {
    pub total_sold: i64,
    pub revenue: Money,
    pub last_sold_at: Option<DateTime<Utc>>,
}

/// A product document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    sku: String,
    price: Money,
    inventory: Inventory,
    sales_stats: SalesStats,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// Current unit price.
    pub fn price(&self) -> Money {
        self.price
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn sales_stats(&self) -> &SalesStats {
        &self.sales_stats
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true once available stock has dropped to the reorder point.
    pub fn needs_reorder(&self) -> bool {
        self.inventory.needs_reorder()
    }

    /// Applies a signed change to the on-hand quantity.
    pub(crate) fn adjust_quantity(&mut self, delta: i64) -> Result<()> {
        let Some(quantity) = self.inventory.quantity.checked_add(delta) else {
            return Err(DomainError::validation(format!(
                "adjusting product {} by {delta} overflows the stock counter",
                self.id
            )));
        };
        if quantity < 0 {
            return Err(DomainError::validation(format!(
                "adjusting product {} by {delta} would leave quantity at {quantity}",
                self.id
            )));
        }
        if quantity < self.inventory.reserved {
            return Err(DomainError::validation(format!(
                "adjusting product {} by {delta} would leave quantity {quantity} below reserved {}",
                self.id, self.inventory.reserved
            )));
        }
        self.inventory.quantity = quantity;
        self.inventory.recompute();
        Ok(())
    }

    /// Moves `quantity` units from available to reserved.
    pub(crate) fn reserve(&mut self, quantity: u32) -> Result<()> {
        if i64::from(quantity) > self.inventory.available {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                available: self.inventory.available,
                requested: quantity,
            });
        }
        self.inventory.reserved += i64::from(quantity);
        self.inventory.recompute();
        Ok(())
    }

    /// Moves `quantity` units from reserved back to available.
    pub(crate) fn release(&mut self, quantity: u32) -> Result<()> {
        if i64::from(quantity) > self.inventory.reserved {
            return Err(DomainError::OverRelease {
                product_id: self.id,
                reserved: self.inventory.reserved,
                requested: quantity,
            });
        }
        self.inventory.reserved -= i64::from(quantity);
        self.inventory.recompute();
        Ok(())
    }

    pub(crate) fn accrue_sale(
        &mut self,
        quantity: u32,
        revenue: Money,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let total_revenue = self.sales_stats.revenue.checked_add(revenue).ok_or_else(|| {
            DomainError::validation(format!("revenue of product {} is out of range", self.id))
        })?;
        self.sales_stats.total_sold += i64::from(quantity);
        self.sales_stats.revenue = total_revenue;
        self.sales_stats.last_sold_at = Some(at);
        Ok(())
    }

    /// Sets a manual status, or with `None` returns to the derived one.
    pub(crate) fn set_status(&mut self, status: Option<InventoryStatus>) -> Result<()> {
        match status {
            Some(status) if !status.is_manual() => {
                return Err(DomainError::validation(format!(
                    "{status} is derived from stock levels and cannot be set directly"
                )));
            }
            Some(status) => self.inventory.status = status,
            None => self.inventory.status = InventoryStatus::Available,
        }
        self.inventory.recompute();
        Ok(())
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub quantity: u32,
    pub reorder_point: u32,
    pub reorder_quantity: u32,
}

impl NewProduct {
    /// Creates input with no stock and no reorder thresholds.
    pub fn new(name: impl Into<String>, sku: impl Into<String>, price: Money) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            price,
            quantity: 0,
            reorder_point: 0,
            reorder_quantity: 0,
        }
    }

    /// Sets the initial on-hand quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the reorder thresholds.
    pub fn with_reorder(mut self, point: u32, quantity: u32) -> Self {
        self.reorder_point = point;
        self.reorder_quantity = quantity;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name must not be empty"));
        }
        if self.sku.trim().is_empty() {
            return Err(DomainError::validation("product SKU must not be empty"));
        }
        if self.price.is_negative() {
            return Err(DomainError::validation(format!(
                "product price must not be negative, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

/// Creates and reads product documents.
///
/// Stock counters are only ever changed through [`crate::StockLedger`].
#[derive(Clone)]
pub struct ProductCatalog<S> {
    store: S,
    clock: SharedClock,
}

impl<S: DocumentStore> ProductCatalog<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Creates a product. The SKU must be unique.
    #[tracing::instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(&self, input: NewProduct) -> Result<Product> {
        input.validate()?;

        let now = self.clock.now();
        let sku = input.sku.trim().to_string();
        let product = Product {
            id: ProductId::new(),
            name: input.name.trim().to_string(),
            sku: sku.clone(),
            price: input.price,
            inventory: Inventory::new(input.quantity, input.reorder_point, input.reorder_quantity),
            sales_stats: SalesStats::default(),
            created_at: now,
            updated_at: now,
        };

        let document = NewDocument::from_value(PRODUCTS, product.id.into(), now, &product)?
            .with_key(sku.clone());
        self.store.insert(document).await.map_err(|e| match e {
            doc_store::StoreError::DuplicateKey { .. } => DomainError::DuplicateKey {
                entity: "product SKU".to_string(),
                key: sku,
            },
            other => other.into(),
        })?;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Retrieves a product by id.
    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.store
            .get(PRODUCTS, id.into())
            .await?
            .ok_or_else(|| DomainError::not_found("product", id))?
            .into_decoded()
            .map_err(Into::into)
    }

    /// Retrieves a product by SKU.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        match self.store.get_by_key(PRODUCTS, sku.trim()).await? {
            Some(document) => Ok(Some(document.into_decoded()?)),
            None => Ok(None),
        }
    }

    /// Lists products oldest first.
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Product>> {
        let query = DocumentQuery::collection(PRODUCTS)
            .sort(SortOrder::CreatedAsc)
            .offset(offset)
            .limit(limit);
        self.store
            .find(query)
            .await?
            .into_iter()
            .map(|d| d.into_decoded().map_err(Into::into))
            .collect()
    }
}
