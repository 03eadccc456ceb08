use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use photonshop_core::{DomainError, Money, OrderId, ProductId, UserId};

/// Order status lifecycle.
///
/// Every transition out of `Pending` ends the order's participation in the
/// inventory workflow; the only later move is `Shipped` to `Delivered`,
/// which has no inventory effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Failed
        )
    }

    fn can_become(&self, to: OrderStatus) -> bool {
        match self {
            OrderStatus::Pending => to != OrderStatus::Pending,
            OrderStatus::Shipped => to == OrderStatus::Delivered,
            _ => false,
        }
    }

    /// Whether a status change releases any outstanding reservation.
    ///
    /// The release itself is an explicit call at the transition site; this
    /// only classifies the target state.
    pub fn releases_reservation(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Failed)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Order line: product, quantity, and the unit price snapshotted at checkout.
///
/// The snapshot is deliberately decoupled from the live catalog price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    pub fn subtotal(&self) -> Result<Money, DomainError> {
        self.unit_price.times(self.quantity)
    }
}

/// Recipient/shipping snapshot captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// Carrier shipment identifiers recorded on transition to Shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentInfo {
    pub shipment_id: String,
    pub tracking_url: String,
    pub awb_code: String,
}

/// Input for placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub contact: Contact,
    pub items: Vec<OrderItem>,
    pub placed_at: DateTime<Utc>,
}

/// Order aggregate.
///
/// The pair (`inventory_reserved`, `inventory_finalized`) is the reservation
/// state machine: Unreserved (false, false), Reserved (true, false),
/// Finalized (true, true). The flags are mutated only by the reservation
/// engine, through the `mark_*`/`clear_*` methods below; `status` is driven
/// by checkout, the payment callback, and cancellation flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: Option<UserId>,
    contact: Contact,
    items: Vec<OrderItem>,
    total: Money,
    status: OrderStatus,
    inventory_reserved: bool,
    inventory_finalized: bool,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    shipment: Option<ShipmentInfo>,
    placed_at: DateTime<Utc>,
}

impl Order {
    /// Create a Pending order with its line items, atomically and before any
    /// reservation attempt.
    pub fn place(id: OrderId, input: NewOrder) -> Result<Self, DomainError> {
        if input.items.is_empty() {
            return Err(DomainError::validation("order must have at least one item"));
        }
        let mut total = Money::ZERO;
        for item in &input.items {
            if item.quantity == 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }
            total = total.checked_add(item.subtotal()?)?;
        }

        Ok(Self {
            id,
            user_id: input.user_id,
            contact: input.contact,
            items: input.items,
            total,
            status: OrderStatus::Pending,
            inventory_reserved: false,
            inventory_finalized: false,
            gateway_order_id: None,
            gateway_payment_id: None,
            shipment: None,
            placed_at: input.placed_at,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn inventory_reserved(&self) -> bool {
        self.inventory_reserved
    }

    pub fn inventory_finalized(&self) -> bool {
        self.inventory_finalized
    }

    pub fn gateway_order_id(&self) -> Option<&str> {
        self.gateway_order_id.as_deref()
    }

    pub fn gateway_payment_id(&self) -> Option<&str> {
        self.gateway_payment_id.as_deref()
    }

    pub fn shipment(&self) -> Option<&ShipmentInfo> {
        self.shipment.as_ref()
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    /// Payment captured (a gateway payment id was recorded).
    pub fn is_paid(&self) -> bool {
        self.gateway_payment_id.is_some()
    }

    /// Distinct products referenced by the line items, ascending by id.
    ///
    /// This ordering is the global lock order the reservation engine uses to
    /// prevent deadlock between concurrently reserving orders.
    pub fn distinct_product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Check ownership of this order against a requesting identity.
    pub fn ensure_owned_by(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.user_id != Some(user_id) {
            return Err(DomainError::NotOwned);
        }
        Ok(())
    }

    // --- reservation flags (mutated only by the reservation engine) ---

    pub fn mark_reserved(&mut self) -> Result<(), DomainError> {
        if self.inventory_finalized {
            return Err(DomainError::invariant(
                "cannot re-reserve a finalized order",
            ));
        }
        self.inventory_reserved = true;
        Ok(())
    }

    pub fn mark_finalized(&mut self) -> Result<(), DomainError> {
        // Finalization transitions through reservation, never around it.
        if !self.inventory_reserved {
            return Err(DomainError::invariant(
                "cannot finalize inventory that was never reserved",
            ));
        }
        self.inventory_finalized = true;
        Ok(())
    }

    pub fn clear_reservation(&mut self) -> Result<(), DomainError> {
        if self.inventory_finalized {
            return Err(DomainError::invariant(
                "cannot release a finalized reservation",
            ));
        }
        self.inventory_reserved = false;
        Ok(())
    }

    // --- payment bookkeeping ---

    pub fn set_gateway_order(&mut self, gateway_order_id: impl Into<String>) {
        self.gateway_order_id = Some(gateway_order_id.into());
    }

    pub fn record_payment(&mut self, gateway_payment_id: impl Into<String>) {
        self.gateway_payment_id = Some(gateway_payment_id.into());
    }

    // --- status transitions ---

    fn transition(&mut self, to: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_become(to) {
            return Err(DomainError::invariant(format!(
                "order is {} and cannot become {}",
                self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    pub fn mark_shipped(&mut self, shipment: Option<ShipmentInfo>) -> Result<(), DomainError> {
        self.transition(OrderStatus::Shipped)?;
        self.shipment = shipment;
        Ok(())
    }

    pub fn mark_delivered(&mut self) -> Result<(), DomainError> {
        self.transition(OrderStatus::Delivered)
    }

    /// Transition to Cancelled. The caller releases any outstanding
    /// reservation explicitly before calling this (visible at the call site,
    /// not hidden behind a storage trigger).
    pub fn mark_cancelled(&mut self) -> Result<(), DomainError> {
        debug_assert!(!self.inventory_reserved || self.inventory_finalized);
        self.transition(OrderStatus::Cancelled)
    }

    /// Transition to Failed. Same release discipline as `mark_cancelled`.
    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        self.transition(OrderStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_contact() -> Contact {
        Contact {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9999999999".to_string(),
            address: "12 MG Road".to_string(),
            city: "Vijayawada".to_string(),
            state: "Andhra Pradesh".to_string(),
            pincode: "520001".to_string(),
        }
    }

    fn item(product_id: ProductId, quantity: u32, unit_price: u64) -> OrderItem {
        OrderItem {
            product_id,
            quantity,
            unit_price: Money::from_minor(unit_price),
        }
    }

    fn place(items: Vec<OrderItem>) -> Order {
        Order::place(
            OrderId::new(),
            NewOrder {
                user_id: Some(UserId::new()),
                contact: test_contact(),
                items,
                placed_at: Utc::now(),
            },
        )
        .unwrap()
    }

    #[test]
    fn place_computes_total_from_snapshots() {
        let order = place(vec![
            item(ProductId::new(), 2, 100_00),
            item(ProductId::new(), 1, 50_00),
        ]);
        assert_eq!(order.total(), Money::from_minor(250_00));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(!order.inventory_reserved());
        assert!(!order.inventory_finalized());
    }

    #[test]
    fn place_rejects_empty_order() {
        let err = Order::place(
            OrderId::new(),
            NewOrder {
                user_id: None,
                contact: test_contact(),
                items: vec![],
                placed_at: Utc::now(),
            },
        )
        .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn place_rejects_zero_quantity() {
        let err = Order::place(
            OrderId::new(),
            NewOrder {
                user_id: None,
                contact: test_contact(),
                items: vec![item(ProductId::new(), 0, 100)],
                placed_at: Utc::now(),
            },
        )
        .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn distinct_product_ids_sorted_ascending_and_deduped() {
        let low = ProductId::from_uuid(Uuid::from_u128(1));
        let high = ProductId::from_uuid(Uuid::from_u128(9));
        let order = place(vec![
            item(high, 1, 100),
            item(low, 2, 100),
            item(high, 3, 100),
        ]);
        assert_eq!(order.distinct_product_ids(), vec![low, high]);
    }

    #[test]
    fn finalize_requires_reservation() {
        let mut order = place(vec![item(ProductId::new(), 1, 100)]);
        let err = order.mark_finalized().unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            other => panic!("expected InvariantViolation, got {other:?}"),
        }

        order.mark_reserved().unwrap();
        order.mark_finalized().unwrap();
        assert!(order.inventory_reserved());
        assert!(order.inventory_finalized());
    }

    #[test]
    fn finalized_reservation_cannot_be_released() {
        let mut order = place(vec![item(ProductId::new(), 1, 100)]);
        order.mark_reserved().unwrap();
        order.mark_finalized().unwrap();
        assert!(order.clear_reservation().is_err());
    }

    #[test]
    fn pending_transitions_to_each_target_state() {
        for target in [
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ] {
            let mut order = place(vec![item(ProductId::new(), 1, 100)]);
            match target {
                OrderStatus::Shipped => order.mark_shipped(None).unwrap(),
                OrderStatus::Delivered => order.mark_delivered().unwrap(),
                OrderStatus::Cancelled => order.mark_cancelled().unwrap(),
                OrderStatus::Failed => order.mark_failed().unwrap(),
                OrderStatus::Pending => unreachable!(),
            }
            assert_eq!(order.status(), target);
        }
    }

    #[test]
    fn shipped_order_can_only_be_delivered() {
        let mut order = place(vec![item(ProductId::new(), 1, 100)]);
        order.mark_shipped(None).unwrap();
        assert!(!order.status().is_terminal());
        assert!(order.mark_cancelled().is_err());
        assert!(order.mark_failed().is_err());
        order.mark_delivered().unwrap();
        assert!(order.status().is_terminal());
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut order = place(vec![item(ProductId::new(), 1, 100)]);
        order.mark_cancelled().unwrap();
        assert!(order.mark_shipped(None).is_err());
        assert!(order.mark_failed().is_err());
    }

    #[test]
    fn cancellation_and_failure_release_reservations_shipment_does_not() {
        assert!(OrderStatus::Cancelled.releases_reservation());
        assert!(OrderStatus::Failed.releases_reservation());
        assert!(!OrderStatus::Shipped.releases_reservation());
        assert!(!OrderStatus::Delivered.releases_reservation());
    }

    #[test]
    fn ownership_check() {
        let owner = UserId::new();
        let order = Order::place(
            OrderId::new(),
            NewOrder {
                user_id: Some(owner),
                contact: test_contact(),
                items: vec![item(ProductId::new(), 1, 100)],
                placed_at: Utc::now(),
            },
        )
        .unwrap();

        order.ensure_owned_by(owner).unwrap();
        match order.ensure_owned_by(UserId::new()).unwrap_err() {
            DomainError::NotOwned => {}
            other => panic!("expected NotOwned, got {other:?}"),
        }
    }
}
