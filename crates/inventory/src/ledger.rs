//! Stock ledger trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use photonshop_core::ProductId;

use crate::level::StockLevel;

/// Stock ledger operation error.
///
/// Infrastructure failures only; "the conditional update did not match" is a
/// normal `false` return, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// The product has no stock row.
    #[error("no stock record for product {product_id}")]
    UnknownProduct { product_id: ProductId },

    /// The product already has a stock row.
    #[error("stock record already exists for product {product_id}")]
    AlreadyExists { product_id: ProductId },

    /// Backing storage failed (lock poisoned, connection lost, ...).
    #[error("stock storage failure: {0}")]
    Storage(String),
}

/// Per-product stock ledger.
///
/// Every operation is a single atomic conditional update against one product
/// row, so the ledger alone can never oversell. Batching several rows into an
/// all-or-nothing unit is the reservation engine's job; it takes its own
/// product locks on top of these primitives.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Create a stock row for a product with an initial `on_hand` quantity.
    async fn create(&self, product_id: ProductId, on_hand: u64) -> Result<(), StockError>;

    /// Read the current counters for a product.
    async fn level(&self, product_id: ProductId) -> Result<StockLevel, StockError>;

    /// Restock arrival: `on_hand += qty`.
    async fn receive(&self, product_id: ProductId, qty: u64) -> Result<(), StockError>;

    /// `allocated += qty` iff `allocated + qty <= on_hand`; false otherwise
    /// with no mutation.
    async fn try_allocate(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError>;

    /// `allocated -= qty; on_hand -= qty` iff both counters cover `qty`.
    async fn try_commit(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError>;

    /// `allocated -= qty` guarded by `allocated >= qty`; a no-match is
    /// silently ignored (release is idempotent by construction).
    async fn release(&self, product_id: ProductId, qty: u64) -> Result<(), StockError>;
}

#[async_trait]
impl<L> StockLedger for Arc<L>
where
    L: StockLedger + ?Sized,
{
    async fn create(&self, product_id: ProductId, on_hand: u64) -> Result<(), StockError> {
        (**self).create(product_id, on_hand).await
    }

    async fn level(&self, product_id: ProductId) -> Result<StockLevel, StockError> {
        (**self).level(product_id).await
    }

    async fn receive(&self, product_id: ProductId, qty: u64) -> Result<(), StockError> {
        (**self).receive(product_id, qty).await
    }

    async fn try_allocate(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError> {
        (**self).try_allocate(product_id, qty).await
    }

    async fn try_commit(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError> {
        (**self).try_commit(product_id, qty).await
    }

    async fn release(&self, product_id: ProductId, qty: u64) -> Result<(), StockError> {
        (**self).release(product_id, qty).await
    }
}

/// In-memory stock ledger.
///
/// Intended for tests/dev. The table lock stands in for row locks: each
/// operation reads and conditionally mutates one row while holding it, which
/// gives the same atomicity as the SQL `UPDATE ... WHERE` counterpart.
#[derive(Debug, Default)]
pub struct InMemoryStockLedger {
    rows: RwLock<HashMap<ProductId, StockLevel>>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_row<T>(
        &self,
        product_id: ProductId,
        f: impl FnOnce(&mut StockLevel) -> T,
    ) -> Result<T, StockError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StockError::Storage("lock poisoned".to_string()))?;
        let row = rows
            .get_mut(&product_id)
            .ok_or(StockError::UnknownProduct { product_id })?;
        Ok(f(row))
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn create(&self, product_id: ProductId, on_hand: u64) -> Result<(), StockError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StockError::Storage("lock poisoned".to_string()))?;
        if rows.contains_key(&product_id) {
            return Err(StockError::AlreadyExists { product_id });
        }
        rows.insert(product_id, StockLevel::new(on_hand));
        Ok(())
    }

    async fn level(&self, product_id: ProductId) -> Result<StockLevel, StockError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StockError::Storage("lock poisoned".to_string()))?;
        rows.get(&product_id)
            .copied()
            .ok_or(StockError::UnknownProduct { product_id })
    }

    async fn receive(&self, product_id: ProductId, qty: u64) -> Result<(), StockError> {
        self.with_row(product_id, |row| row.receive(qty))
    }

    async fn try_allocate(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError> {
        self.with_row(product_id, |row| row.try_allocate(qty))
    }

    async fn try_commit(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError> {
        self.with_row(product_id, |row| row.try_commit(qty))
    }

    async fn release(&self, product_id: ProductId, qty: u64) -> Result<(), StockError> {
        self.with_row(product_id, |row| row.release(qty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product_id() -> ProductId {
        ProductId::new()
    }

    #[tokio::test]
    async fn create_and_read_level() {
        let ledger = InMemoryStockLedger::new();
        let product = test_product_id();
        ledger.create(product, 5).await.unwrap();

        let level = ledger.level(product).await.unwrap();
        assert_eq!(level.on_hand(), 5);
        assert_eq!(level.allocated(), 0);
        assert_eq!(level.available(), 5);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_row() {
        let ledger = InMemoryStockLedger::new();
        let product = test_product_id();
        ledger.create(product, 5).await.unwrap();

        match ledger.create(product, 5).await.unwrap_err() {
            StockError::AlreadyExists { product_id } => assert_eq!(product_id, product),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_product_is_an_error() {
        let ledger = InMemoryStockLedger::new();
        let product = test_product_id();

        match ledger.try_allocate(product, 1).await.unwrap_err() {
            StockError::UnknownProduct { product_id } => assert_eq!(product_id, product),
            other => panic!("expected UnknownProduct, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn allocate_commit_release_cycle() {
        let ledger = InMemoryStockLedger::new();
        let product = test_product_id();
        ledger.create(product, 10).await.unwrap();

        assert!(ledger.try_allocate(product, 4).await.unwrap());
        assert!(!ledger.try_allocate(product, 7).await.unwrap());

        assert!(ledger.try_commit(product, 4).await.unwrap());
        let level = ledger.level(product).await.unwrap();
        assert_eq!(level.on_hand(), 6);
        assert_eq!(level.allocated(), 0);

        // Release with nothing allocated is silently ignored.
        ledger.release(product, 4).await.unwrap();
        assert_eq!(ledger.level(product).await.unwrap().allocated(), 0);
    }

    #[tokio::test]
    async fn receive_raises_on_hand() {
        let ledger = InMemoryStockLedger::new();
        let product = test_product_id();
        ledger.create(product, 1).await.unwrap();
        ledger.receive(product, 9).await.unwrap();
        assert_eq!(ledger.level(product).await.unwrap().on_hand(), 10);
    }
}
