//! Tunable policies for the ledger and the order workflow.

use std::str::FromStr;

/// Default number of compare-and-set attempts before giving up.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 64;

/// Default tax rate in basis points (10%).
pub const DEFAULT_TAX_RATE_BPS: u32 = 1_000;

/// What happens when an inventory transaction cannot be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditPolicy {
    /// Log a warning and keep the stock mutation.
    #[default]
    BestEffort,
    /// Undo the stock mutation and fail with a transient error.
    FailClosed,
}

impl AuditPolicy {
    /// Returns the policy name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditPolicy::BestEffort => "best-effort",
            AuditPolicy::FailClosed => "fail-closed",
        }
    }
}

impl FromStr for AuditPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" => Ok(AuditPolicy::BestEffort),
            "fail-closed" | "fail_closed" => Ok(AuditPolicy::FailClosed),
            other => Err(format!(
                "unknown audit policy '{other}' (expected best-effort or fail-closed)"
            )),
        }
    }
}

/// Whether an order that has already shipped may still be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancellationPolicy {
    /// Cancellation is only possible before the order ships.
    #[default]
    BeforeShipment,
    /// SHIPPED orders may be cancelled as well.
    AllowAfterShipment,
}

impl CancellationPolicy {
    /// Returns the policy name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationPolicy::BeforeShipment => "before-shipment",
            CancellationPolicy::AllowAfterShipment => "allow-after-shipment",
        }
    }
}

impl FromStr for CancellationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before-shipment" | "before_shipment" => Ok(CancellationPolicy::BeforeShipment),
            "allow-after-shipment" | "allow_after_shipment" => {
                Ok(CancellationPolicy::AllowAfterShipment)
            }
            other => Err(format!(
                "unknown cancellation policy '{other}' (expected before-shipment or allow-after-shipment)"
            )),
        }
    }
}

/// Settings for [`crate::StockLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Compare-and-set attempts per operation.
    pub max_write_attempts: u32,
    /// Behaviour when the transaction log rejects an append.
    pub audit_policy: AuditPolicy,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            audit_policy: AuditPolicy::default(),
        }
    }
}

/// Settings for order placement and the order state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSettings {
    /// Tax applied when the caller does not supply one.
    pub default_tax_rate_bps: u32,
    /// Whether SHIPPED orders can be cancelled.
    pub cancellation_policy: CancellationPolicy,
    /// Compare-and-set attempts for order and user documents.
    pub max_write_attempts: u32,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            default_tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            cancellation_policy: CancellationPolicy::default(),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}
