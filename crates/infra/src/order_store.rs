//! Order persistence trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use photonshop_core::{DomainError, OrderId, UserId};
use photonshop_orders::Order;

use crate::error::ServiceError;

/// Order persistence.
///
/// Orders are stored as whole snapshots; `update` replaces the stored copy.
/// Payment callbacks only carry gateway identifiers, so the store also
/// indexes orders by their gateway order id.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), ServiceError>;

    async fn get(&self, order_id: OrderId) -> Result<Order, ServiceError>;

    async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Order, ServiceError>;

    async fn update(&self, order: &Order) -> Result<(), ServiceError>;

    /// Remove an order that never completed checkout.
    async fn delete(&self, order_id: OrderId) -> Result<(), ServiceError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError>;
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn insert(&self, order: Order) -> Result<(), ServiceError> {
        (**self).insert(order).await
    }

    async fn get(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        (**self).get(order_id).await
    }

    async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Order, ServiceError> {
        (**self).find_by_gateway_order(gateway_order_id).await
    }

    async fn update(&self, order: &Order) -> Result<(), ServiceError> {
        (**self).update(order).await
    }

    async fn delete(&self, order_id: OrderId) -> Result<(), ServiceError> {
        (**self).delete(order_id).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        (**self).list_for_user(user_id).await
    }
}

/// In-memory order store.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    rows: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> ServiceError {
    ServiceError::Storage("lock poisoned".to_string())
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), ServiceError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&order.id()) {
            return Err(ServiceError::Storage(format!(
                "order {} already exists",
                order.id()
            )));
        }
        rows.insert(order.id(), order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        rows.get(&order_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found().into())
    }

    async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Order, ServiceError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        rows.values()
            .find(|order| order.gateway_order_id() == Some(gateway_order_id))
            .cloned()
            .ok_or_else(|| DomainError::not_found().into())
    }

    async fn update(&self, order: &Order) -> Result<(), ServiceError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if !rows.contains_key(&order.id()) {
            return Err(DomainError::not_found().into());
        }
        rows.insert(order.id(), order.clone());
        Ok(())
    }

    async fn delete(&self, order_id: OrderId) -> Result<(), ServiceError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&order_id);
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        let mut orders: Vec<Order> = rows
            .values()
            .filter(|order| order.user_id() == Some(user_id))
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.placed_at());
        Ok(orders)
    }
}
