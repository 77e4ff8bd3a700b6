//! Order placement input.

use std::collections::HashSet;

use domain::{DomainError, Money, PaymentInfo, ProductId, Result, UserId};

/// One requested line of a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Overrides the catalog price when set.
    pub unit_price: Option<Money>,
    /// Per-unit discount.
    pub discount: Money,
}

impl CartItem {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
            discount: Money::zero(),
        }
    }

    pub fn with_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }
}

/// A request to place an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    /// Defaults to the configured tax rate applied to the subtotal.
    pub tax: Option<Money>,
    /// Defaults to zero.
    pub shipping_cost: Option<Money>,
    /// Order-level discount. May not exceed the subtotal.
    pub discount: Money,
    pub payment: PaymentInfo,
    pub shipping_address: String,
    pub notes: Option<String>,
    /// Recorded as `updated_by` / `performed_by`.
    pub placed_by: Option<String>,
}

impl PlaceOrder {
    pub fn new(
        user_id: UserId,
        items: Vec<CartItem>,
        payment_method: impl Into<String>,
        shipping_address: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            items,
            tax: None,
            shipping_cost: None,
            discount: Money::zero(),
            payment: PaymentInfo {
                method: payment_method.into(),
                reference: None,
            },
            shipping_address: shipping_address.into(),
            notes: None,
            placed_by: None,
        }
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.tax = Some(tax);
        self
    }

    pub fn with_shipping_cost(mut self, cost: Money) -> Self {
        self.shipping_cost = Some(cost);
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn placed_by(mut self, who: impl Into<String>) -> Self {
        self.placed_by = Some(who.into());
        self
    }

    /// Checks everything that can be checked without touching the store.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if item.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if !seen.insert(item.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears more than once; combine the lines",
                    item.product_id
                )));
            }
            if item.unit_price.is_some_and(|p| p.is_negative()) || item.discount.is_negative() {
                return Err(DomainError::validation(format!(
                    "price and discount for product {} must not be negative",
                    item.product_id
                )));
            }
        }

        for (label, amount) in [
            ("tax", self.tax),
            ("shipping cost", self.shipping_cost),
            ("discount", Some(self.discount)),
        ] {
            if amount.is_some_and(|a| a.is_negative()) {
                return Err(DomainError::validation(format!("{label} must not be negative")));
            }
        }

        if self.shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping address must not be empty"));
        }
        if self.payment.method.trim().is_empty() {
            return Err(DomainError::validation("payment method must not be empty"));
        }
        Ok(())
    }
}
