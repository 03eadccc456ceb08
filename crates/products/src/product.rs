use serde::{Deserialize, Serialize};

use photonshop_core::{DomainError, Money, ProductId};

/// Input for creating a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
}

/// Catalog product.
///
/// Carries the live price that checkout snapshots into each order line. The
/// single well-typed price/stock model means no runtime probing of field
/// names anywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    price: Money,
    active: bool,
}

impl Product {
    pub fn create(id: ProductId, input: NewProduct) -> Result<Self, DomainError> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if input.price.is_zero() {
            return Err(DomainError::validation("price must be positive"));
        }

        Ok(Self {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            active: true,
        })
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Live catalog price. Order lines snapshot this at checkout and are not
    /// affected by later changes.
    pub fn price(&self) -> Money {
        self.price
    }

    pub fn set_price(&mut self, price: Money) -> Result<(), DomainError> {
        if price.is_zero() {
            return Err(DomainError::validation("price must be positive"));
        }
        self.price = price;
        Ok(())
    }

    /// Check if the product can be sold (listed and not retired).
    pub fn can_be_sold(&self) -> bool {
        self.active
    }

    pub fn retire(&mut self) {
        self.active = false;
    }
}
