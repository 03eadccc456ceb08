//! Carrier client trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use photonshop_core::{Money, OrderId, ProductId};
use photonshop_orders::{Order, ShipmentInfo};

/// Carrier operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CarrierError {
    /// The carrier rejected the shipment request.
    #[error("carrier rejected shipment for order {order_id}: {reason}")]
    Rejected { order_id: OrderId, reason: String },

    /// The request could not be built from the order.
    #[error("invalid shipment request: {0}")]
    InvalidRequest(String),

    /// Transport failure.
    #[error("carrier transport failure: {0}")]
    Transport(String),
}

/// How the shopper paid, from the carrier's point of view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Prepaid,
    CashOnDelivery,
}

/// One line of a shipment manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub sku: ProductId,
    pub units: u32,
    pub selling_price: Money,
}

/// Everything the carrier needs to create a shipment.
///
/// A flat snapshot of the order at ship time. Package dimensions are fixed
/// defaults until per-product metadata exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub order_id: OrderId,
    pub order_date: NaiveDate,
    pub pickup_location: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub items: Vec<ShipmentItem>,
    pub payment_method: PaymentMethod,
    pub sub_total: Money,
    pub length_cm: u32,
    pub breadth_cm: u32,
    pub height_cm: u32,
    pub weight_grams: u32,
}

impl ShipmentRequest {
    /// Build a shipment request from an order snapshot.
    ///
    /// Fails on an order with no items; nothing to manifest.
    pub fn from_order(order: &Order, pickup_location: &str) -> Result<Self, CarrierError> {
        let items: Vec<ShipmentItem> = order
            .items()
            .iter()
            .map(|item| ShipmentItem {
                sku: item.product_id,
                units: item.quantity,
                selling_price: item.unit_price,
            })
            .collect();
        if items.is_empty() {
            return Err(CarrierError::InvalidRequest(
                "order has no items to ship".to_string(),
            ));
        }

        let contact = order.contact();
        let payment_method = if order.is_paid() {
            PaymentMethod::Prepaid
        } else {
            PaymentMethod::CashOnDelivery
        };

        Ok(Self {
            order_id: order.id(),
            order_date: order.placed_at().date_naive(),
            pickup_location: pickup_location.to_string(),
            customer_name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            address: contact.address.clone(),
            city: contact.city.clone(),
            state: contact.state.clone(),
            pincode: contact.pincode.clone(),
            country: "India".to_string(),
            items,
            payment_method,
            sub_total: order.total(),
            length_cm: 10,
            breadth_cm: 10,
            height_cm: 10,
            weight_grams: 500,
        })
    }
}

/// External shipping carrier.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Register the shipment with the carrier and get back its identifiers.
    async fn create_shipment(&self, request: &ShipmentRequest)
    -> Result<ShipmentInfo, CarrierError>;
}

#[async_trait]
impl<C> CarrierClient for Arc<C>
where
    C: CarrierClient + ?Sized,
{
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ShipmentInfo, CarrierError> {
        (**self).create_shipment(request).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCarrierState {
    shipments: Vec<ShipmentRequest>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory carrier for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarrierClient {
    state: Arc<RwLock<InMemoryCarrierState>>,
}

impl InMemoryCarrierClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_shipment` calls fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_create = fail;
        }
    }

    /// Shipment requests received so far, in order.
    pub fn shipments(&self) -> Vec<ShipmentRequest> {
        self.state
            .read()
            .map(|state| state.shipments.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CarrierClient for InMemoryCarrierClient {
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ShipmentInfo, CarrierError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| CarrierError::Transport("state lock poisoned".to_string()))?;

        if state.fail_on_create {
            return Err(CarrierError::Rejected {
                order_id: request.order_id,
                reason: "carrier unavailable".to_string(),
            });
        }

        state.next_id += 1;
        let shipment_id = format!("ship_{:06}", state.next_id);
        state.shipments.push(request.clone());
        Ok(ShipmentInfo {
            shipment_id: shipment_id.clone(),
            tracking_url: format!("https://track.example.com/{shipment_id}"),
            awb_code: format!("AWB{:09}", state.next_id),
        })
    }
}
