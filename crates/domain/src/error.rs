//! Domain error types.

use doc_store::StoreError;
use thiserror::Error;

use crate::ids::ProductId;
use crate::order::OrderStatus;

/// Stable classification of every domain failure.
///
/// Callers branch on the kind rather than on individual variants; the CLI
/// maps each kind to an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A product, order or user does not exist.
    NotFound,
    /// A reservation precondition failed.
    InsufficientStock,
    /// The order state machine rejected an edge.
    InvalidTransition,
    /// Malformed input.
    ValidationFailed,
    /// A unique constraint was violated.
    DuplicateKey,
    /// Store I/O or contention; safe to retry.
    Transient,
}

impl ErrorKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::DuplicateKey => "duplicate_key",
            ErrorKind::Transient => "transient",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Not enough available stock to reserve.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: u32,
    },

    /// The requested status change is not an edge of the state machine.
    #[error("Invalid transition for order {order_number}: {from} -> {to}")]
    InvalidTransition {
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A release asked for more units than are reserved.
    #[error("Cannot release {requested} units of product {product_id}: only {reserved} reserved")]
    OverRelease {
        product_id: ProductId,
        reserved: i64,
        requested: u32,
    },

    /// A unique key is already taken.
    #[error("Duplicate {entity}: {key}")]
    DuplicateKey { entity: String, key: String },

    /// Compare-and-set kept losing to concurrent writers.
    #[error("Write contention on {entity} {id}: gave up after {attempts} attempts")]
    Contention {
        entity: &'static str,
        id: String,
        attempts: u32,
    },

    /// The audit record could not be written and the mutation was undone.
    #[error("Audit log unavailable, {operation} on product {product_id} was undone: {reason}")]
    AuditFailed {
        product_id: ProductId,
        operation: &'static str,
        reason: String,
    },

    /// The audit record could not be written and undoing the mutation failed
    /// as well, so the stock change is still in place. Retrying would apply
    /// it twice.
    #[error(
        "Audit log unavailable and undoing {operation} on product {product_id} failed, \
         the change is still applied: {reason}; undo: {undo_error}"
    )]
    AuditUndoFailed {
        product_id: ProductId,
        operation: &'static str,
        reason: String,
        undo_error: String,
    },

    /// The order status changed but one or more side effects failed.
    ///
    /// Each failure names its step. A failed release on cancellation
    /// leaves those units reserved; they have to be released by hand.
    #[error("Order {order_number} moved to {status} but side effects failed: {}", failures.join("; "))]
    SideEffectFailed {
        order_number: String,
        status: OrderStatus,
        failures: Vec<String>,
    },

    /// An error occurred in the document store.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// A stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Builds a `NotFound` error for an entity and id.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Builds a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// Returns the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            DomainError::Validation(_) | DomainError::OverRelease { .. } => {
                ErrorKind::ValidationFailed
            }
            DomainError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            DomainError::Contention { .. }
            | DomainError::AuditFailed { .. }
            | DomainError::AuditUndoFailed { .. }
            | DomainError::SideEffectFailed { .. }
            | DomainError::Store(_)
            | DomainError::Serialization(_) => ErrorKind::Transient,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => DomainError::NotFound {
                entity: collection,
                id: id.to_string(),
            },
            StoreError::DuplicateKey { collection, key } => DomainError::DuplicateKey {
                entity: collection,
                key,
            },
            StoreError::Serialization(e) => DomainError::Serialization(e),
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
