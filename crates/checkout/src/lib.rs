//! Storefront workflows that span more than one aggregate.
//!
//! Placing an order touches the order, the stock of every product in the
//! cart and the buyer's identity records; registering an account can take
//! over a guest record and its orders. Both commit through a single
//! multi-stream append and retry on conflict. Customer and admin
//! notifications go out afterwards on a background task and never affect
//! the outcome of the workflow that raised them.

pub mod admin;
pub mod caller;
pub mod cart;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod notifications;
pub mod registration;
pub mod settings;

pub use admin::{OrderAdmin, OrderUpdate};
pub use caller::Caller;
pub use cart::{CartItem, CartSubmission, ShippingDetails, ValidCart};
pub use coordinator::{CheckoutCoordinator, MAX_ATTEMPTS};
pub use error::{CheckoutError, Result};
pub use identity::{Identity, IdentityReconciler};
pub use notifications::{
    InMemoryNotifier, LoggingNotifier, Notification, NotificationDispatcher, Notifier, NotifyError,
    Sent,
};
pub use registration::{RegisteredUser, Registrar, Registration};
pub use settings::{SettingsResolver, SettingsUpdate};
