//! Postgres-backed stock ledger.
//!
//! Each trait method is a single conditional `UPDATE ... WHERE` statement, so
//! the guard and the mutation are atomic at the row level without an explicit
//! transaction. A `CHECK (allocated <= on_hand)` constraint backs the same
//! invariant at the schema level.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StockError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StockError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `AlreadyExists` | Duplicate stock row for a product |
//! | Database (check constraint violation) | `23514` | `Storage` | Counter invariant breached (should be prevented by the WHERE guards) |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed / network | N/A | `Storage` | Connection failures |

use std::sync::Arc;

use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use photonshop_core::ProductId;
use photonshop_inventory::{StockError, StockLedger, StockLevel};

/// Schema for the stock table, applied by deployment migrations.
pub const STOCK_LEVELS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS stock_levels (
    product_id UUID PRIMARY KEY,
    on_hand BIGINT NOT NULL,
    allocated BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CHECK (on_hand >= 0),
    CHECK (allocated >= 0),
    CHECK (allocated <= on_hand)
)
"#;

/// Postgres-backed stock ledger.
///
/// Thread-safe via the SQLx connection pool. Quantities are stored as
/// `BIGINT`; the u64 trait surface is clamped to `i64::MAX` on write, which
/// is far beyond any physical stock count.
#[derive(Debug, Clone)]
pub struct PostgresStockLedger {
    pool: Arc<PgPool>,
}

impl PostgresStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the stock table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), StockError> {
        sqlx::query(STOCK_LEVELS_SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn exists(&self, product_id: ProductId) -> Result<bool, StockError> {
        let row = sqlx::query("SELECT 1 FROM stock_levels WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists", e))?;
        Ok(row.is_some())
    }

    /// A conditional update matched no row: either the guard failed (normal
    /// `false`) or the product has no row at all (an error).
    async fn no_match(&self, product_id: ProductId) -> Result<bool, StockError> {
        if self.exists(product_id).await? {
            Ok(false)
        } else {
            Err(StockError::UnknownProduct { product_id })
        }
    }
}

fn as_db_qty(qty: u64) -> i64 {
    i64::try_from(qty).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl StockLedger for PostgresStockLedger {
    #[instrument(skip(self), fields(product_id = %product_id, on_hand), err)]
    async fn create(&self, product_id: ProductId, on_hand: u64) -> Result<(), StockError> {
        sqlx::query("INSERT INTO stock_levels (product_id, on_hand, allocated) VALUES ($1, $2, 0)")
            .bind(product_id.as_uuid())
            .bind(as_db_qty(on_hand))
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StockError::AlreadyExists { product_id }
                } else {
                    map_sqlx_error("create", e)
                }
            })?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn level(&self, product_id: ProductId) -> Result<StockLevel, StockError> {
        let row = sqlx::query("SELECT on_hand, allocated FROM stock_levels WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("level", e))?
            .ok_or(StockError::UnknownProduct { product_id })?;

        let on_hand: i64 = row
            .try_get("on_hand")
            .map_err(|e| StockError::Storage(format!("failed to read on_hand: {e}")))?;
        let allocated: i64 = row
            .try_get("allocated")
            .map_err(|e| StockError::Storage(format!("failed to read allocated: {e}")))?;

        let mut level = StockLevel::new(on_hand.max(0) as u64);
        if !level.try_allocate(allocated.max(0) as u64) {
            return Err(StockError::Storage(format!(
                "stock row for {product_id} violates allocated <= on_hand"
            )));
        }
        Ok(level)
    }

    #[instrument(skip(self), fields(product_id = %product_id, qty), err)]
    async fn receive(&self, product_id: ProductId, qty: u64) -> Result<(), StockError> {
        let result = sqlx::query(
            "UPDATE stock_levels SET on_hand = on_hand + $2, updated_at = NOW() \
             WHERE product_id = $1",
        )
        .bind(product_id.as_uuid())
        .bind(as_db_qty(qty))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("receive", e))?;

        if result.rows_affected() == 0 {
            return Err(StockError::UnknownProduct { product_id });
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id, qty), err)]
    async fn try_allocate(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError> {
        let result = sqlx::query(
            "UPDATE stock_levels SET allocated = allocated + $2, updated_at = NOW() \
             WHERE product_id = $1 AND allocated + $2 <= on_hand",
        )
        .bind(product_id.as_uuid())
        .bind(as_db_qty(qty))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("try_allocate", e))?;

        let matched = result.rows_affected() > 0;
        Span::current().record("matched", matched);
        if matched {
            Ok(true)
        } else {
            self.no_match(product_id).await
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id, qty), err)]
    async fn try_commit(&self, product_id: ProductId, qty: u64) -> Result<bool, StockError> {
        let result = sqlx::query(
            "UPDATE stock_levels \
             SET allocated = allocated - $2, on_hand = on_hand - $2, updated_at = NOW() \
             WHERE product_id = $1 AND allocated >= $2 AND on_hand >= $2",
        )
        .bind(product_id.as_uuid())
        .bind(as_db_qty(qty))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("try_commit", e))?;

        let matched = result.rows_affected() > 0;
        Span::current().record("matched", matched);
        if matched {
            Ok(true)
        } else {
            self.no_match(product_id).await
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id, qty), err)]
    async fn release(&self, product_id: ProductId, qty: u64) -> Result<(), StockError> {
        let result = sqlx::query(
            "UPDATE stock_levels SET allocated = allocated - $2, updated_at = NOW() \
             WHERE product_id = $1 AND allocated >= $2",
        )
        .bind(product_id.as_uuid())
        .bind(as_db_qty(qty))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("release", e))?;

        // A redundant release on an existing row is a silent no-op; a missing
        // row is still an error.
        if result.rows_affected() == 0 && !self.exists(product_id).await? {
            return Err(StockError::UnknownProduct { product_id });
        }
        Ok(())
    }
}

/// Map SQLx errors to StockError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StockError {
    match err {
        sqlx::Error::Database(db_err) => StockError::Storage(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StockError::Storage(format!("connection pool closed in {operation}"))
        }
        other => StockError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
