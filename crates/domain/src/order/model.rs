//! The order document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::OrderStatus;
use crate::error::{DomainError, Result};
use crate::ids::{OrderId, ProductId, UserId};
use crate::money::Money;
use crate::product::Product;

/// Customer details copied from the user at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub email: String,
}

/// A line of an order with the product details frozen at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    /// Unit price charged.
    pub price: Money,
    pub quantity: u32,
    /// Per-unit discount.
    pub discount: Money,
    /// `(price - discount) * quantity`.
    pub subtotal: Money,
}

impl LineItem {
    /// Snapshots a product into a line. `price` overrides the catalog price.
    pub fn snapshot(
        product: &Product,
        quantity: u32,
        price: Option<Money>,
        discount: Money,
    ) -> Result<Self> {
        let price = price.unwrap_or_else(|| product.price());
        Ok(Self {
            product_id: product.id(),
            name: product.name().to_string(),
            sku: product.sku().to_string(),
            price,
            quantity,
            discount,
            subtotal: Self::subtotal_for(price, discount, quantity)?,
        })
    }

    /// `(price - discount) * quantity`, failing validation on overflow.
    pub fn subtotal_for(price: Money, discount: Money, quantity: u32) -> Result<Money> {
        price
            .checked_sub(discount)
            .and_then(|unit| unit.checked_times(quantity))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "line total of {quantity} x ({price} - {discount}) is out of range"
                ))
            })
    }
}

/// Monetary totals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Pricing {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    /// `subtotal - discount + tax + shipping`.
    pub total: Money,
}

impl Pricing {
    /// Fails validation if the total does not fit in a `Money`.
    pub fn new(subtotal: Money, discount: Money, tax: Money, shipping: Money) -> Result<Self> {
        let total = subtotal
            .checked_sub(discount)
            .and_then(|m| m.checked_add(tax))
            .and_then(|m| m.checked_add(shipping))
            .ok_or_else(|| DomainError::validation("order total is out of range"))?;
        Ok(Self {
            subtotal,
            discount,
            tax,
            shipping,
            total,
        })
    }
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
}

impl ShippingInfo {
    pub fn to(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            carrier: None,
            tracking_number: None,
            shipped_at: None,
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub to: OrderStatus,
    pub note: Option<String>,
    pub updated_by: Option<String>,
    /// Recorded when moving to SHIPPED.
    pub carrier: Option<String>,
    /// Recorded when moving to SHIPPED.
    pub tracking_number: Option<String>,
}

impl TransitionRequest {
    pub fn to(status: OrderStatus) -> Self {
        Self {
            to: status,
            note: None,
            updated_by: None,
            carrier: None,
            tracking_number: None,
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn updated_by(mut self, who: Option<String>) -> Self {
        self.updated_by = who;
        self
    }

    pub fn tracking(mut self, carrier: Option<String>, tracking_number: Option<String>) -> Self {
        self.carrier = carrier;
        self.tracking_number = tracking_number;
        self
    }
}

/// Everything needed to create an order except its number.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer: CustomerSnapshot,
    pub items: Vec<LineItem>,
    pub pricing: Pricing,
    pub payment: PaymentInfo,
    pub shipping: ShippingInfo,
    pub notes: Option<String>,
}

impl OrderDraft {
    /// Builds a PENDING order with a single history entry.
    pub fn into_pending(
        self,
        order_number: String,
        placed_at: DateTime<Utc>,
        placed_by: Option<String>,
    ) -> Order {
        Order {
            id: self.id,
            order_number,
            user_id: self.user_id,
            customer: self.customer,
            items: self.items,
            pricing: self.pricing,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                timestamp: placed_at,
                note: Some("Order placed".to_string()),
                updated_by: placed_by,
            }],
            payment: self.payment,
            shipping: self.shipping,
            notes: self.notes,
            created_at: placed_at,
            completed_at: None,
            cancelled_at: None,
        }
    }
}

/// An order document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    customer: CustomerSnapshot,
    items: Vec<LineItem>,
    pricing: Pricing,
    status: OrderStatus,
    status_history: Vec<StatusChange>,
    payment: PaymentInfo,
    shipping: ShippingInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// History entries, oldest first. The last entry is the current status.
    pub fn status_history(&self) -> &[StatusChange] {
        &self.status_history
    }

    pub fn payment(&self) -> &PaymentInfo {
        &self.payment
    }

    pub fn shipping(&self) -> &ShippingInfo {
        &self.shipping
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Total number of units across all lines.
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Records a status change and the timestamps that go with it.
    ///
    /// The caller is responsible for checking the edge is legal.
    pub(crate) fn record_transition(&mut self, request: &TransitionRequest, at: DateTime<Utc>) {
        self.status = request.to;
        self.status_history.push(StatusChange {
            status: request.to,
            timestamp: at,
            note: request.note.clone(),
            updated_by: request.updated_by.clone(),
        });

        match request.to {
            OrderStatus::Shipped => {
                self.shipping.shipped_at = Some(at);
                if request.carrier.is_some() {
                    self.shipping.carrier = request.carrier.clone();
                }
                if request.tracking_number.is_some() {
                    self.shipping.tracking_number = request.tracking_number.clone();
                }
            }
            OrderStatus::Delivered => self.completed_at = Some(at),
            OrderStatus::Cancelled => self.cancelled_at = Some(at),
            _ => {}
        }
    }
}
