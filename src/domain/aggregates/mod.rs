//! Aggregates module
pub mod order;

pub use order::{NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus, PaymentUpdate};
