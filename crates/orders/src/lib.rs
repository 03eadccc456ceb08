//! Order domain module.
//!
//! Contains the order aggregate (line items with price snapshots, status
//! lifecycle, reservation flags) and delivery estimation. No IO, no storage.

pub mod delivery;
pub mod order;

pub use delivery::{expected_delivery_range, is_metro_address};
pub use order::{Contact, NewOrder, Order, OrderItem, OrderStatus, ShipmentInfo};
