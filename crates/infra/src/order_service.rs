//! Order lifecycle operations after checkout: cancellation, abandonment,
//! shipping, delivery.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument, warn};

use photonshop_core::{DomainError, OrderId, UserId};
use photonshop_inventory::ReservationEngine;
use photonshop_notifications::{Notification, Notifier, Template};
use photonshop_orders::{Order, OrderStatus, expected_delivery_range};
use photonshop_shipping::{CarrierClient, ShipmentRequest};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::order_store::OrderStore;

/// Drives order status transitions and their inventory side effects.
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    engine: Arc<ReservationEngine>,
    carrier: Arc<dyn CarrierClient>,
    notifier: Arc<dyn Notifier>,
    config: ServiceConfig,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        engine: Arc<ReservationEngine>,
        carrier: Arc<dyn CarrierClient>,
        notifier: Arc<dyn Notifier>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            orders,
            engine,
            carrier,
            notifier,
            config,
        }
    }

    pub async fn get(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.orders.get(order_id).await
    }

    /// An order fetched on behalf of a shopper; hides other users' orders.
    pub async fn get_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Order, ServiceError> {
        let order = self.orders.get(order_id).await?;
        order.ensure_owned_by(user_id)?;
        Ok(order)
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        self.orders.list_for_user(user_id).await
    }

    /// Shopper-initiated cancellation.
    ///
    /// Only the owner can cancel, and only while the order is Pending. Any
    /// live hold is returned to stock before the status flips.
    #[instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn cancel(&self, order_id: OrderId, user_id: UserId) -> Result<Order, ServiceError> {
        let mut order = self.orders.get(order_id).await?;
        order.ensure_owned_by(user_id)?;
        // Validate the transition before the ledger is touched, so a
        // rejected cancel leaves no partial effect behind.
        if order.status() != OrderStatus::Pending {
            return Err(DomainError::validation(format!(
                "only a pending order can be cancelled, this one is {}",
                order.status()
            ))
            .into());
        }

        self.engine.release(&mut order).await?;
        order.mark_cancelled()?;
        self.orders.update(&order).await?;

        info!(order_id = %order_id, "order cancelled, stock released");
        self.notify(&order, Template::OrderCancelled, json!({})).await;
        Ok(order)
    }

    /// Expire an order whose shopper never completed payment.
    ///
    /// Run by a background sweep; a no-op for orders that already moved on.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn abandon(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        let mut order = self.orders.get(order_id).await?;
        if order.status() != OrderStatus::Pending || order.is_paid() {
            return Ok(order);
        }

        self.engine.release(&mut order).await?;
        order.mark_failed()?;
        self.orders.update(&order).await?;

        info!(order_id = %order_id, "abandoned order failed, stock released");
        Ok(order)
    }

    /// Dispatch an order.
    ///
    /// Only an order whose inventory has been finalized can ship; anything
    /// still holding a provisional reservation is rejected, otherwise its
    /// units would stay allocated forever once the order leaves Pending.
    /// With carrier push enabled the shipment is registered with the carrier
    /// first and its identifiers are recorded on the order; otherwise the
    /// status flips with no carrier call (manual dispatch).
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn ship(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        let mut order = self.orders.get(order_id).await?;
        if !order.inventory_finalized() {
            return Err(DomainError::validation(
                "order cannot ship before its inventory is finalized",
            )
            .into());
        }

        let shipment = if self.config.carrier_push_enabled {
            let request = ShipmentRequest::from_order(&order, &self.config.pickup_location)?;
            Some(self.carrier.create_shipment(&request).await?)
        } else {
            None
        };

        order.mark_shipped(shipment)?;
        self.orders.update(&order).await?;

        let (earliest, latest) =
            expected_delivery_range(order.placed_at(), &order.contact().address);
        let mut context = json!({
            "order_id": order.id().to_string(),
            "expected_from": earliest.to_string(),
            "expected_to": latest.to_string(),
        });
        if let Some(info) = order.shipment() {
            context["tracking_url"] = json!(info.tracking_url);
            context["awb_code"] = json!(info.awb_code);
        }
        info!(order_id = %order_id, "order shipped");
        self.notify(&order, Template::OrderShipped, context).await;
        Ok(order)
    }

    /// Record delivery.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn deliver(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        let mut order = self.orders.get(order_id).await?;
        order.mark_delivered()?;
        self.orders.update(&order).await?;
        info!(order_id = %order_id, "order delivered");
        Ok(order)
    }

    async fn notify(&self, order: &Order, template: Template, mut context: serde_json::Value) {
        if !context.is_object() {
            context = json!({});
        }
        context["order_id"] = json!(order.id().to_string());
        let notification = Notification {
            recipient: order.contact().email.clone(),
            template,
            context,
        };
        if let Err(err) = self.notifier.send(notification).await {
            warn!(order_id = %order.id(), %err, "notification delivery failed");
        }
    }
}
