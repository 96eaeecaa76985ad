pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod purchases;
pub mod reports;
pub mod settings;
pub mod users;
