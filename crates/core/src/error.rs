//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Ledger and
/// gateway infrastructure concerns are wrapped at the service layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A conditional ledger update could not be satisfied for this product.
    ///
    /// Raised by reserve (user-visible "out of stock") and by confirm (a rare
    /// consistency violation that triggers a compensating refund).
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Payment signature mismatch. Security-relevant, never retried.
    #[error("payment signature verification failed")]
    VerificationFailed,

    /// A requested resource was not found.
    #[error("not found")]
    NotFound,

    /// The resource exists but belongs to a different identity.
    #[error("not owned by the requesting user")]
    NotOwned,

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn insufficient_stock(product_id: ProductId) -> Self {
        Self::InsufficientStock { product_id }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
