//! Order placement.
//!
//! The [`OrderOrchestrator`] turns a cart into a persisted PENDING order:
//! 1. Validate the request and look up the customer
//! 2. For each line in order: look up the product, check and reserve stock
//! 3. Price the order and issue an order number
//! 4. Persist the order
//!
//! If any step after the first reservation fails, every reservation made
//! for the attempt is released in reverse order before the error is
//! returned.

pub mod cart;
pub mod orchestrator;
pub mod reservations;

pub use cart::{CartItem, PlaceOrder};
pub use orchestrator::OrderOrchestrator;
pub use reservations::Reservations;
