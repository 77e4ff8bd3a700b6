//! Domain layer for the inventory and order workflow.
//!
//! This crate provides:
//! - Product documents with their stock counters and the [`StockLedger`]
//!   that mutates them through version compare-and-set
//! - The append-only [`TransactionLog`] audit trail
//! - Users and their aggregate order statistics
//! - The order document model and the [`OrderStateMachine`]
//!
//! Every service is constructed from an injected [`doc_store::DocumentStore`]
//! and [`common::Clock`]; nothing here holds process-wide state.

pub mod error;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod order;
mod persistence;
pub mod product;
pub mod settings;
pub mod transaction_log;
pub mod user;

pub use error::{DomainError, ErrorKind, Result};
pub use ids::{OrderId, ProductId, TransactionId, UserId};
pub use ledger::{LedgerEntry, StockLedger};
pub use money::Money;
pub use order::{
    CustomerSnapshot, LineItem, Order, OrderDraft, OrderFilter, OrderNumberGenerator,
    OrderRepository, OrderStateMachine, OrderStatus, PaymentInfo, Pricing, ShippingInfo,
    StatusChange, TransitionRequest,
};
pub use product::{Inventory, InventoryStatus, NewProduct, Product, ProductCatalog, SalesStats};
pub use settings::{AuditPolicy, CancellationPolicy, LedgerSettings, OrderSettings};
pub use transaction_log::{
    InventoryTransaction, TransactionLog, TransactionSummary, TransactionType, TypeTotals,
};
pub use user::{NewUser, User, UserDirectory, UserStats};

/// Collection names used in the document store.
pub mod collections {
    /// Product documents, keyed by SKU.
    pub const PRODUCTS: &str = "products";
    /// Append-only inventory transaction records.
    pub const INVENTORY_TRANSACTIONS: &str = "inventory_transactions";
    /// User documents, keyed by lowercase email.
    pub const USERS: &str = "users";
    /// Order documents, keyed by order number.
    pub const ORDERS: &str = "orders";
}
