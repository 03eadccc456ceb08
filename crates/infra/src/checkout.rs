//! Checkout: place an order, hold its stock, open a gateway payment order.

use std::sync::Arc;

use tracing::{info, instrument};

use photonshop_core::OrderId;
use photonshop_inventory::ReservationEngine;
use photonshop_orders::{NewOrder, Order};
use photonshop_payments::PaymentGateway;

use crate::error::ServiceError;
use crate::order_store::OrderStore;

/// Places orders with stock held before the shopper is sent to pay.
///
/// Reservation happens before payment authorization, so the shopper can never
/// pay for units that were already promised to someone else. If the hold
/// fails the freshly inserted order is deleted again and the shopper sees an
/// out-of-stock outcome instead of a dangling order.
pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    engine: Arc<ReservationEngine>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        engine: Arc<ReservationEngine>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            orders,
            engine,
            gateway,
        }
    }

    /// Place an order: validate, persist, reserve stock, authorize payment.
    ///
    /// Returns the stored order carrying its gateway order id, ready for the
    /// shopper to complete payment against.
    #[instrument(skip(self, input), fields(order_id))]
    pub async fn place_order(&self, input: NewOrder) -> Result<Order, ServiceError> {
        let order_id = OrderId::new();
        tracing::Span::current().record("order_id", tracing::field::display(order_id));

        let mut order = Order::place(order_id, input)?;
        self.orders.insert(order.clone()).await?;

        if let Err(err) = self.engine.reserve(&mut order).await {
            // No stock held; drop the order instead of leaving it Pending
            // forever.
            self.orders.delete(order_id).await?;
            return Err(err.into());
        }

        let gateway_order = match self.gateway.authorize(order_id, order.total()).await {
            Ok(gateway_order) => gateway_order,
            Err(err) => {
                // Undo the hold before surfacing the gateway failure.
                self.engine.release(&mut order).await?;
                self.orders.delete(order_id).await?;
                return Err(err.into());
            }
        };
        order.set_gateway_order(gateway_order.gateway_order_id);
        self.orders.update(&order).await?;

        info!(order_id = %order_id, total = %order.total(), "order placed with stock held");
        Ok(order)
    }
}
