//! Monetary amounts in the smallest currency unit.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An amount of money in minor units (e.g. paise, cents).
///
/// Arithmetic is checked; overflow surfaces as a validation error rather than
/// wrapping silently.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub fn minor(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("money addition overflowed"))
    }

    /// Multiply a unit price by a line quantity.
    pub fn times(self, qty: u32) -> Result<Money, DomainError> {
        self.0
            .checked_mul(u64::from(qty))
            .map(Money)
            .ok_or_else(|| DomainError::validation("money multiplication overflowed"))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
