//! Human-readable order numbers.

use chrono::NaiveDate;
use common::SharedClock;
use doc_store::DocumentStore;

use crate::error::Result;

/// Formats `ORD-YYYYMMDD-NNNN`. Sequences past 9999 widen rather than wrap.
pub fn format_order_number(date: NaiveDate, sequence: i64) -> String {
    format!("ORD-{}-{:04}", date.format("%Y%m%d"), sequence)
}

/// Name of the per-day counter behind the sequence.
pub fn counter_name(date: NaiveDate) -> String {
    format!("order_number:{}", date.format("%Y%m%d"))
}

/// Issues order numbers from an atomic per-day counter.
///
/// Concurrent callers always receive distinct numbers.
#[derive(Clone)]
pub struct OrderNumberGenerator<S> {
    store: S,
    clock: SharedClock,
}

impl<S: DocumentStore> OrderNumberGenerator<S> {
    pub fn new(store: S, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Returns the next number for the current UTC day.
    pub async fn next(&self) -> Result<String> {
        let today = self.clock.now().date_naive();
        let sequence = self.store.increment_counter(&counter_name(today)).await?;
        Ok(format_order_number(today, sequence))
    }
}
