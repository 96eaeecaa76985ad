//! Orders: frozen lines and totals, fulfillment status and payment.

mod aggregate;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::{Order, PlaceOrder};
pub use events::{
    DeliveryPriceChangedData, OrderDeletedData, OrderEvent, OrderLinkedToUserData,
    OrderPlacedData, OrderStatusChangedData, PaymentStatusChangedData,
};
pub use service::OrderService;
pub use state::{OrderStatus, PaymentMethod, PaymentStatus};
pub use value_objects::{OrderLine, PaymentInfo};

use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order has not been placed")]
    NotPlaced,

    #[error("Order already placed")]
    AlreadyPlaced,

    #[error("Order has been deleted")]
    Deleted,

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order already belongs to a registered account")]
    NotGuestOrder,

    #[error("{0}")]
    Invalid(ValidationErrors),
}
