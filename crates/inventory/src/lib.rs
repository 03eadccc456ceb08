//! Stock ledger and reservation engine.
//!
//! The ledger tracks per-product `(on_hand, allocated)` counters behind
//! atomic conditional updates; the engine batches multi-item orders under a
//! deterministic per-product lock ordering so concurrent checkouts can never
//! deadlock or oversell.

pub mod engine;
pub mod ledger;
pub mod level;

pub use engine::{ReservationEngine, ReservationError};
pub use ledger::{InMemoryStockLedger, StockError, StockLedger};
pub use level::StockLevel;
