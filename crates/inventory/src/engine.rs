//! Reservation engine: reserve/confirm/release across all line items of an
//! order, all-or-nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, Weak};

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{instrument, warn};

use photonshop_core::{DomainError, ProductId};
use photonshop_orders::Order;

use crate::ledger::{StockError, StockLedger};

/// Reservation engine operation error.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Business outcome (insufficient stock, flag invariant, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Ledger infrastructure failure.
    #[error(transparent)]
    Stock(#[from] StockError),
}

impl ReservationError {
    /// The product that ran out, if this is an insufficient-stock outcome.
    pub fn insufficient_product(&self) -> Option<ProductId> {
        match self {
            ReservationError::Domain(DomainError::InsufficientStock { product_id }) => {
                Some(*product_id)
            }
            _ => None,
        }
    }
}

/// Lock table handing out one async mutex per product.
///
/// Callers must pass product ids already sorted ascending; acquiring guards
/// in that fixed order across every call site is what makes deadlock between
/// overlapping orders impossible.
///
/// The table holds weak references so a product's mutex lives only while
/// some caller still holds a handle to it; idle entries are pruned on the
/// next acquisition, keeping the table bounded by the number of products
/// under active contention rather than every product ever reserved.
#[derive(Debug, Default)]
struct ProductLocks {
    inner: StdMutex<HashMap<ProductId, Weak<Mutex<()>>>>,
}

impl ProductLocks {
    fn handles(&self, product_ids: &[ProductId]) -> Result<Vec<Arc<Mutex<()>>>, StockError> {
        debug_assert!(product_ids.is_sorted());
        let mut table = self
            .inner
            .lock()
            .map_err(|_| StockError::Storage("lock table poisoned".to_string()))?;
        table.retain(|_, slot| slot.strong_count() > 0);
        Ok(product_ids
            .iter()
            .map(|id| {
                let slot = table.entry(*id).or_default();
                match slot.upgrade() {
                    Some(handle) => handle,
                    None => {
                        let handle = Arc::new(Mutex::new(()));
                        *slot = Arc::downgrade(&handle);
                        handle
                    }
                }
            })
            .collect())
    }

    async fn lock_ordered(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<OwnedMutexGuard<()>>, StockError> {
        let handles = self.handles(product_ids)?;
        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        Ok(guards)
    }
}

/// Orchestrates reserve/confirm/release transitions for whole orders.
///
/// Each operation locks the order's distinct products in ascending id order,
/// applies the ledger's conditional updates per line item, and either
/// completes fully or undoes its own partial work before returning — no
/// partial reservation is ever observable. All three operations are
/// idempotent via the order's reservation flags, so retrying after a crash
/// needs no external idempotency key.
pub struct ReservationEngine {
    ledger: Arc<dyn StockLedger>,
    locks: ProductLocks,
}

impl ReservationEngine {
    pub fn new(ledger: Arc<dyn StockLedger>) -> Self {
        Self {
            ledger,
            locks: ProductLocks::default(),
        }
    }

    pub fn ledger(&self) -> &Arc<dyn StockLedger> {
        &self.ledger
    }

    /// Provisionally hold stock for every line item of the order.
    ///
    /// No-op if the order is already reserved. On any shortfall the
    /// allocations made by this call are undone (while the product locks are
    /// still held) and `InsufficientStock` names the offending product.
    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn reserve(&self, order: &mut Order) -> Result<(), ReservationError> {
        if order.inventory_reserved() {
            return Ok(());
        }

        let products = order.distinct_product_ids();
        let _guards = self.locks.lock_ordered(&products).await?;

        let mut applied: Vec<(ProductId, u64)> = Vec::with_capacity(order.items().len());
        for item in order.items() {
            let qty = u64::from(item.quantity);
            if self.ledger.try_allocate(item.product_id, qty).await? {
                applied.push((item.product_id, qty));
            } else {
                for (product_id, q) in applied.into_iter().rev() {
                    self.ledger.release(product_id, q).await?;
                }
                return Err(DomainError::insufficient_stock(item.product_id).into());
            }
        }

        order.mark_reserved()?;
        Ok(())
    }

    /// Convert the order's reservation into a permanent deduction.
    ///
    /// No-op if already finalized; requires an existing reservation. A
    /// shortfall here means some other path consumed the allocation — a
    /// consistency violation the lock discipline should prevent. It is
    /// surfaced as `InsufficientStock` (after undoing this call's partial
    /// commits) and not retried automatically.
    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn confirm(&self, order: &mut Order) -> Result<(), ReservationError> {
        if order.inventory_finalized() {
            return Ok(());
        }
        if !order.inventory_reserved() {
            return Err(DomainError::invariant(
                "cannot confirm an order that was never reserved",
            )
            .into());
        }

        let products = order.distinct_product_ids();
        let _guards = self.locks.lock_ordered(&products).await?;

        let mut committed: Vec<(ProductId, u64)> = Vec::with_capacity(order.items().len());
        for item in order.items() {
            let qty = u64::from(item.quantity);
            if self.ledger.try_commit(item.product_id, qty).await? {
                committed.push((item.product_id, qty));
            } else {
                self.uncommit(&committed).await?;
                warn!(product_id = %item.product_id, "commit shortfall during confirmation");
                return Err(DomainError::insufficient_stock(item.product_id).into());
            }
        }

        order.mark_finalized()?;
        Ok(())
    }

    /// Reverse the order's reservation without consuming stock.
    ///
    /// No-op unless the order is reserved and not finalized.
    #[instrument(skip(self, order), fields(order_id = %order.id()))]
    pub async fn release(&self, order: &mut Order) -> Result<(), ReservationError> {
        if !order.inventory_reserved() || order.inventory_finalized() {
            return Ok(());
        }

        let products = order.distinct_product_ids();
        let _guards = self.locks.lock_ordered(&products).await?;

        for item in order.items() {
            self.ledger
                .release(item.product_id, u64::from(item.quantity))
                .await?;
        }

        order.clear_reservation()?;
        Ok(())
    }

    /// Undo a partial confirm: put the committed quantities back on hand and
    /// re-allocate them, restoring the pre-confirm reservation. Runs while
    /// the product locks are still held, so no intermediate state escapes.
    async fn uncommit(&self, committed: &[(ProductId, u64)]) -> Result<(), StockError> {
        for (product_id, qty) in committed.iter().rev() {
            self.ledger.receive(*product_id, *qty).await?;
            if !self.ledger.try_allocate(*product_id, *qty).await? {
                // Cannot happen while we hold the product lock; the quantity
                // we just returned is free by construction.
                warn!(product_id = %product_id, qty, "failed to restore allocation during rollback");
            }
        }
        Ok(())
    }
}
