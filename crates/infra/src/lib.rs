//! Service layer and storage adapters.
//!
//! Wires the reservation engine, payment gateway, carrier, and notifier into
//! the checkout, payment-callback, and fulfilment flows, and provides the
//! Postgres-backed stock ledger behind the same `StockLedger` trait the
//! in-memory implementation serves.

pub mod checkout;
pub mod config;
pub mod error;
pub mod order_service;
pub mod order_store;
pub mod payment_callback;
pub mod stock_postgres;


pub use checkout::CheckoutService;
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use order_service::OrderService;
pub use order_store::{InMemoryOrderStore, OrderStore};
pub use payment_callback::{PaymentCallback, PaymentCallbackHandler};
pub use stock_postgres::PostgresStockLedger;
