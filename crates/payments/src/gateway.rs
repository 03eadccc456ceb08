//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use photonshop_core::{Money, OrderId};

/// Payment gateway operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// The gateway refused to open a payment order.
    #[error("payment authorization declined: {0}")]
    Declined(String),

    /// The gateway refused or failed a refund.
    #[error("refund failed for payment {payment_id}: {reason}")]
    RefundFailed { payment_id: String, reason: String },

    /// Transport or state failure.
    #[error("payment gateway failure: {0}")]
    Gateway(String),
}

/// A gateway-side payment order, opened before the shopper pays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
}

/// External payment provider.
///
/// `authorize` opens a gateway order for the amount due; the shopper then
/// completes payment against it out of band and the gateway calls back with
/// a signed `(gateway_order_id, gateway_payment_id)` pair.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, order_id: OrderId, amount: Money)
    -> Result<GatewayOrder, PaymentError>;

    /// Refund a captured payment in full.
    async fn refund(&self, gateway_payment_id: &str, amount: Money) -> Result<(), PaymentError>;
}

#[async_trait]
impl<G> PaymentGateway for Arc<G>
where
    G: PaymentGateway + ?Sized,
{
    async fn authorize(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<GatewayOrder, PaymentError> {
        (**self).authorize(order_id, amount).await
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Money) -> Result<(), PaymentError> {
        (**self).refund(gateway_payment_id, amount).await
    }
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    orders: HashMap<String, (OrderId, Money)>,
    refunds: Vec<(String, Money)>,
    next_id: u32,
    fail_on_authorize: bool,
    fail_on_refund: bool,
}

/// In-memory gateway for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `authorize` calls fail.
    pub fn set_fail_on_authorize(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_authorize = fail;
        }
    }

    /// Make subsequent `refund` calls fail.
    pub fn set_fail_on_refund(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_refund = fail;
        }
    }

    /// Refunds issued so far, in order.
    pub fn refunds(&self) -> Vec<(String, Money)> {
        self.state
            .read()
            .map(|state| state.refunds.clone())
            .unwrap_or_default()
    }

    pub fn order_count(&self) -> usize {
        self.state.read().map(|state| state.orders.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn authorize(
        &self,
        order_id: OrderId,
        amount: Money,
    ) -> Result<GatewayOrder, PaymentError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| PaymentError::Gateway("state lock poisoned".to_string()))?;

        if state.fail_on_authorize {
            return Err(PaymentError::Declined("gateway unavailable".to_string()));
        }

        state.next_id += 1;
        let gateway_order_id = format!("order_{:06}", state.next_id);
        state
            .orders
            .insert(gateway_order_id.clone(), (order_id, amount));
        Ok(GatewayOrder { gateway_order_id })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: Money) -> Result<(), PaymentError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| PaymentError::Gateway("state lock poisoned".to_string()))?;

        if state.fail_on_refund {
            return Err(PaymentError::RefundFailed {
                payment_id: gateway_payment_id.to_string(),
                reason: "gateway unavailable".to_string(),
            });
        }

        state.refunds.push((gateway_payment_id.to_string(), amount));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn authorize_assigns_sequential_order_ids() {
        let gateway = InMemoryPaymentGateway::new();
        let first = gateway
            .authorize(OrderId::new(), Money::from_minor(500_00))
            .await
            .unwrap();
        let second = gateway
            .authorize(OrderId::new(), Money::from_minor(250_00))
            .await
            .unwrap();

        assert_eq!(first.gateway_order_id, "order_000001");
        assert_eq!(second.gateway_order_id, "order_000002");
        assert_eq!(gateway.order_count(), 2);
    }

    #[tokio::test]
    async fn authorize_failure_leaves_no_order() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_authorize(true);

        let err = gateway
            .authorize(OrderId::new(), Money::from_minor(500_00))
            .await
            .unwrap_err();
        match err {
            PaymentError::Declined(_) => {}
            other => panic!("expected Declined, got {other:?}"),
        }
        assert_eq!(gateway.order_count(), 0);
    }

    #[tokio::test]
    async fn refunds_are_recorded() {
        let gateway = InMemoryPaymentGateway::new();
        gateway
            .refund("pay_123", Money::from_minor(500_00))
            .await
            .unwrap();

        assert_eq!(
            gateway.refunds(),
            vec![("pay_123".to_string(), Money::from_minor(500_00))]
        );
    }

    #[tokio::test]
    async fn refund_failure_is_reported() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_refund(true);

        let err = gateway
            .refund("pay_123", Money::from_minor(500_00))
            .await
            .unwrap_err();
        match err {
            PaymentError::RefundFailed { payment_id, .. } => assert_eq!(payment_id, "pay_123"),
            other => panic!("expected RefundFailed, got {other:?}"),
        }
        assert!(gateway.refunds().is_empty());
    }
}
