//! Service-layer error type.

use thiserror::Error;

use photonshop_core::{DomainError, ProductId};
use photonshop_inventory::{ReservationError, StockError};
use photonshop_payments::PaymentError;
use photonshop_shipping::CarrierError;

/// Anything a service operation can fail with.
///
/// Domain outcomes (insufficient stock, bad signature, not found) pass
/// through unchanged so callers can branch on them; infrastructure failures
/// keep their own variants for logging and retries.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Carrier(#[from] CarrierError),

    #[error("order storage failure: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ReservationError> for ServiceError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Domain(e) => ServiceError::Domain(e),
            ReservationError::Stock(e) => ServiceError::Stock(e),
        }
    }
}

impl ServiceError {
    /// The product that ran out, if this is an insufficient-stock outcome.
    pub fn insufficient_product(&self) -> Option<ProductId> {
        match self {
            ServiceError::Domain(DomainError::InsufficientStock { product_id }) => {
                Some(*product_id)
            }
            _ => None,
        }
    }

    pub fn is_verification_failure(&self) -> bool {
        matches!(self, ServiceError::Domain(DomainError::VerificationFailed))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Domain(DomainError::NotFound))
    }
}
