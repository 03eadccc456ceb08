//! Payment callback handling: verify, finalize stock, or compensate.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use photonshop_core::DomainError;
use photonshop_inventory::ReservationEngine;
use photonshop_notifications::{Notification, Notifier, Template};
use photonshop_orders::Order;
use photonshop_payments::{PaymentGateway, verify_payment_signature};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::order_store::OrderStore;

/// What the gateway posts after the shopper completes payment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallback {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Turns verified payment callbacks into confirmed orders.
///
/// An unverified callback changes nothing. A verified one finalizes the
/// order's stock hold; if that finalization fails, the money is already
/// captured, so the handler refunds it, drops the hold, and fails the order.
pub struct PaymentCallbackHandler {
    orders: Arc<dyn OrderStore>,
    engine: Arc<ReservationEngine>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    config: ServiceConfig,
}

impl PaymentCallbackHandler {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        engine: Arc<ReservationEngine>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            orders,
            engine,
            gateway,
            notifier,
            config,
        }
    }

    /// Handle one callback delivery.
    ///
    /// Safe to retry: a replayed callback for an already-confirmed order
    /// returns the order unchanged.
    #[instrument(skip(self, callback), fields(gateway_order_id = %callback.gateway_order_id))]
    pub async fn handle(&self, callback: PaymentCallback) -> Result<Order, ServiceError> {
        let mut order = self
            .orders
            .find_by_gateway_order(&callback.gateway_order_id)
            .await?;

        // Gateway retries deliver the same callback more than once.
        if order.inventory_finalized() && order.is_paid() {
            return Ok(order);
        }

        if !verify_payment_signature(
            self.config.payment_webhook_secret.as_bytes(),
            &callback.gateway_order_id,
            &callback.gateway_payment_id,
            &callback.signature,
        ) {
            warn!(order_id = %order.id(), "rejected payment callback with bad signature");
            // A forged or corrupted callback voids the checkout: the hold
            // goes back to stock and the order fails.
            self.engine.release(&mut order).await?;
            order.mark_failed()?;
            self.orders.update(&order).await?;
            return Err(DomainError::VerificationFailed.into());
        }

        order.record_payment(callback.gateway_payment_id.clone());

        if let Err(err) = self.engine.confirm(&mut order).await {
            return self.compensate(order, &callback, err.into()).await;
        }

        self.orders.update(&order).await?;
        info!(order_id = %order.id(), "payment confirmed, stock finalized");
        self.notify(&order, Template::OrderConfirmation).await;
        Ok(order)
    }

    /// The payment is captured but the stock hold could not be finalized:
    /// refund the shopper, drop the hold, fail the order.
    async fn compensate(
        &self,
        mut order: Order,
        callback: &PaymentCallback,
        cause: ServiceError,
    ) -> Result<Order, ServiceError> {
        error!(
            order_id = %order.id(),
            payment_id = %callback.gateway_payment_id,
            %cause,
            "stock finalization failed after payment capture, compensating"
        );

        // Best-effort: a refund failure is logged for manual follow-up and
        // must not block failing the order.
        if let Err(refund_err) = self
            .gateway
            .refund(&callback.gateway_payment_id, order.total())
            .await
        {
            error!(
                order_id = %order.id(),
                payment_id = %callback.gateway_payment_id,
                %refund_err,
                "compensating refund failed, needs manual follow-up"
            );
        }

        self.engine.release(&mut order).await?;
        order.mark_failed()?;
        self.orders.update(&order).await?;
        Err(cause)
    }

    async fn notify(&self, order: &Order, template: Template) {
        let notification = Notification {
            recipient: order.contact().email.clone(),
            template,
            context: json!({
                "order_id": order.id().to_string(),
                "total": order.total().to_string(),
            }),
        };
        if let Err(err) = self.notifier.send(notification).await {
            warn!(order_id = %order.id(), %err, "notification delivery failed");
        }
    }
}
