//! Configuration loaded from environment variables.

use domain::settings::{DEFAULT_MAX_WRITE_ATTEMPTS, DEFAULT_TAX_RATE_BPS};
use domain::{AuditPolicy, CancellationPolicy, LedgerSettings, OrderSettings};

use crate::error::CliError;

/// Runtime configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (default: in-memory store)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `INVCTL_TAX_RATE_BPS`: default tax rate in basis points (default: `1000`)
/// - `INVCTL_CANCELLATION_POLICY`: `before-shipment` or `allow-after-shipment`
/// - `INVCTL_AUDIT_POLICY`: `best-effort` or `fail-closed`
/// - `INVCTL_MAX_WRITE_ATTEMPTS`: compare-and-set attempts (default: `64`)
/// - `INVCTL_OPERATOR`: recorded as `performed_by` / `updated_by` (default: `"cli"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub log_level: String,
    pub tax_rate_bps: u32,
    pub cancellation_policy: CancellationPolicy,
    pub audit_policy: AuditPolicy,
    pub max_write_attempts: u32,
    pub operator: String,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, CliError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// unset or empty variables. Malformed values are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            database_url: var("DATABASE_URL"),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            tax_rate_bps: parse_var("INVCTL_TAX_RATE_BPS", var("INVCTL_TAX_RATE_BPS"))?
                .unwrap_or(defaults.tax_rate_bps),
            cancellation_policy: parse_var(
                "INVCTL_CANCELLATION_POLICY",
                var("INVCTL_CANCELLATION_POLICY"),
            )?
            .unwrap_or(defaults.cancellation_policy),
            audit_policy: parse_var("INVCTL_AUDIT_POLICY", var("INVCTL_AUDIT_POLICY"))?
                .unwrap_or(defaults.audit_policy),
            max_write_attempts: parse_var(
                "INVCTL_MAX_WRITE_ATTEMPTS",
                var("INVCTL_MAX_WRITE_ATTEMPTS"),
            )?
            .unwrap_or(defaults.max_write_attempts),
            operator: var("INVCTL_OPERATOR").unwrap_or(defaults.operator),
        })
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            max_write_attempts: self.max_write_attempts,
            audit_policy: self.audit_policy,
        }
    }

    pub fn order_settings(&self) -> OrderSettings {
        OrderSettings {
            default_tax_rate_bps: self.tax_rate_bps,
            cancellation_policy: self.cancellation_policy,
            max_write_attempts: self.max_write_attempts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            log_level: "info".to_string(),
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            cancellation_policy: CancellationPolicy::default(),
            audit_policy: AuditPolicy::default(),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            operator: "cli".to_string(),
        }
    }
}

fn parse_var<T>(key: &str, value: Option<String>) -> Result<Option<T>, CliError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e| CliError::Config(format!("{key}: {e}")))
        })
        .transpose()
}
