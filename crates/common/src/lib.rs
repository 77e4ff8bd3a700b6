//! Shared types used across the inventory and order crates.

pub mod clock;
pub mod types;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use types::{DocumentId, ParseIdError};
