//! Storefront domain: catalog products, orders, accounts, settings and the
//! inventory purchase ledger, all event-sourced.
//!
//! Each aggregate validates its commands and returns the events to record.
//! [`CommandHandler`] loads aggregates and appends those events with
//! optimistic concurrency; [`command::stage`] prepares writes for commits that
//! span several streams.

pub mod account;
pub mod aggregate;
pub mod command;
pub mod contact;
pub mod costing;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod outcome;
pub mod product;
pub mod purchase;
pub mod settings;
pub mod validation;

pub use account::{AccountError, AccountService, GuestUser, Role, User};
pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use command::{CommandHandler, CommandResult};
pub use contact::{Address, Email, EmailError, ShippingInfo};
pub use costing::{LineCost, OrderTotals, ProductProfit, profit_margin, rank_products};
pub use error::DomainError;
pub use ids::{OrderId, ProductId, PurchaseId, UserId};
pub use money::Money;
pub use order::{
    Order, OrderError, OrderEvent, OrderLine, OrderService, OrderStatus, PaymentMethod,
    PaymentStatus, PlaceOrder,
};
pub use outcome::{BulkFailure, BulkOutcome};
pub use product::{CatalogService, CostPriceUpdate, NewProduct, Product, ProductError};
pub use purchase::{InventoryPurchase, NewPurchase, PurchaseAmendment, PurchaseLedger};
pub use settings::{Settings, SettingsEvent, settings_id};
pub use validation::{FieldError, ValidationErrors};
