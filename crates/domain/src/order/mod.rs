//! Orders: document model, numbering, persistence and the state machine.

mod model;
mod number;
mod repository;
mod state_machine;
mod status;

pub use model::{
    CustomerSnapshot, LineItem, Order, OrderDraft, PaymentInfo, Pricing, ShippingInfo,
    StatusChange, TransitionRequest,
};
pub use number::{OrderNumberGenerator, counter_name, format_order_number};
pub use repository::{OrderFilter, OrderRepository};
pub use state_machine::OrderStateMachine;
pub use status::OrderStatus;
