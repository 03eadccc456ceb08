//! Catalog product domain module.
//!
//! Pure domain logic only; stock counters live in `photonshop-inventory` and
//! are deliberately not part of the catalog entity.

pub mod product;

pub use product::{NewProduct, Product};
