//! Runtime configuration for the service layer.

use crate::error::ServiceError;

/// Settings the services need at runtime.
///
/// Carrier push is off by default: shipments are registered with the carrier
/// on the Shipped transition only when `carrier_push_enabled` is set, so an
/// operator can run the shop with manual dispatch.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Shared secret used to verify payment callback signatures.
    pub payment_webhook_secret: String,
    /// Push shipments to the carrier automatically on the Shipped transition.
    pub carrier_push_enabled: bool,
    /// Warehouse pickup location the carrier uses.
    pub pickup_location: String,
}

impl ServiceConfig {
    /// Load from the environment.
    ///
    /// `PAYMENT_WEBHOOK_SECRET` is required; `CARRIER_PUSH_ENABLED` and
    /// `CARRIER_PICKUP_LOCATION` default to off and "Home".
    pub fn from_env() -> Result<Self, ServiceError> {
        let payment_webhook_secret = std::env::var("PAYMENT_WEBHOOK_SECRET")
            .map_err(|_| ServiceError::Config("PAYMENT_WEBHOOK_SECRET must be set".to_string()))?;
        let carrier_push_enabled = std::env::var("CARRIER_PUSH_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let pickup_location =
            std::env::var("CARRIER_PICKUP_LOCATION").unwrap_or_else(|_| "Home".to_string());

        Ok(Self {
            payment_webhook_secret,
            carrier_push_enabled,
            pickup_location,
        })
    }
}
