//! Carrier integration: shipment creation requests built from order
//! snapshots, behind a client trait so services and tests share one surface.

pub mod carrier;

pub use carrier::{
    CarrierClient, CarrierError, InMemoryCarrierClient, PaymentMethod, ShipmentItem,
    ShipmentRequest,
};
