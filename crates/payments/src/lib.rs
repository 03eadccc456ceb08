//! Payment gateway integration: order authorization, callback signature
//! verification, and refunds.

pub mod gateway;
pub mod signature;

pub use gateway::{GatewayOrder, InMemoryPaymentGateway, PaymentError, PaymentGateway};
pub use signature::{payment_signature, verify_payment_signature};
