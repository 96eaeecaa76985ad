//! Query side of the storefront back-office.
//!
//! - [`OrderBookView`]: live order listing, kept current by the
//!   [`ProjectionProcessor`] and filterable by owner, email and status.
//! - [`ProfitReporter`]: revenue, cost and profit per period, replayed on
//!   demand from orders and inventory purchases.

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod report;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use report::{PeriodSummary, ProfitReport, ProfitReporter, ReportPeriod, summarize};
pub use views::{OrderBookView, OrderFilter, OrderSummary};
