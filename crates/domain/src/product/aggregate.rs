//! Product aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};
use crate::ids::ProductId;
use crate::money::Money;
use crate::validation::ValidationErrors;

use super::{
    ProductError, ProductEvent,
    events::{ProductListedData, StockDecrementedData},
};

/// Input for listing a new product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Money,
    /// Unknown cost basis is treated as zero.
    #[serde(default)]
    pub cost_price: Option<Money>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub related: Vec<ProductId>,
}

impl NewProduct {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(self.name.trim().is_empty(), "name", "is required");
        errors.check(self.price.is_negative(), "price", "must not be negative");
        errors.check(
            self.cost_price.is_some_and(|c| c.is_negative()),
            "cost_price",
            "must not be negative",
        );
        errors.check(
            self.sizes.iter().any(|s| s.trim().is_empty()),
            "sizes",
            "must not contain blank entries",
        );
        errors.check(
            self.colors.iter().any(|c| c.trim().is_empty()),
            "colors",
            "must not contain blank entries",
        );
        errors.into_result()
    }
}

/// A catalog product and its stock level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    id: Option<ProductId>,
    #[serde(default)]
    version: Version,
    name: String,
    description: String,
    category: String,
    price: Money,
    cost_price: Money,
    stock: u32,
    sizes: Vec<String>,
    colors: Vec<String>,
    is_hidden: bool,
    featured: bool,
    related: Vec<ProductId>,
    listed_at: Option<DateTime<Utc>>,
    delisted: bool,
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(Into::into)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: ProductEvent) {
        match event {
            ProductEvent::ProductListed(data) => self.apply_listed(data),
            ProductEvent::StockDecremented(StockDecrementedData { quantity, .. }) => {
                self.stock = self.stock.saturating_sub(quantity);
            }
            ProductEvent::StockRestocked(data) => {
                self.stock = self.stock.saturating_add(data.quantity);
            }
            ProductEvent::PriceChanged(data) => self.price = data.price,
            ProductEvent::CostPriceChanged(data) => self.cost_price = data.cost_price,
            ProductEvent::ProductDelisted(_) => self.delisted = true,
        }
    }
}

impl SnapshotCapable for Product {
    fn snapshot_interval() -> usize {
        50
    }
}

// Queries
impl Product {
    pub fn product_id(&self) -> Option<ProductId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn cost_price(&self) -> Money {
        self.cost_price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn featured(&self) -> bool {
        self.featured
    }

    pub fn related(&self) -> &[ProductId] {
        &self.related
    }

    pub fn listed_at(&self) -> Option<DateTime<Utc>> {
        self.listed_at
    }

    pub fn is_delisted(&self) -> bool {
        self.delisted
    }

    /// Listed and not removed from the catalog.
    pub fn is_available(&self) -> bool {
        self.id.is_some() && !self.delisted
    }

    /// Variant dimensions the product defines but the selection leaves out.
    pub fn missing_variants(&self, size: Option<&str>, color: Option<&str>) -> Vec<&'static str> {
        let blank = |v: Option<&str>| v.is_none_or(|s| s.trim().is_empty());
        let mut missing = Vec::new();
        if !self.sizes.is_empty() && blank(size) {
            missing.push("size");
        }
        if !self.colors.is_empty() && blank(color) {
            missing.push("color");
        }
        missing
    }
}

// Commands
impl Product {
    pub fn list(&self, product_id: ProductId, input: NewProduct) -> Result<Vec<ProductEvent>, ProductError> {
        if self.id.is_some() {
            return Err(ProductError::AlreadyListed);
        }
        input.validate().map_err(ProductError::Invalid)?;

        Ok(vec![ProductEvent::ProductListed(ProductListedData {
            product_id,
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            price: input.price,
            cost_price: input.cost_price.unwrap_or_default(),
            stock: input.stock,
            sizes: input.sizes,
            colors: input.colors,
            is_hidden: input.is_hidden,
            featured: input.featured,
            related: input.related,
            listed_at: Utc::now(),
        })])
    }

    /// Consumes `quantity` units for an order.
    pub fn decrement_stock(
        &self,
        quantity: u32,
        order_id: AggregateId,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_available()?;
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity);
        }
        if self.stock < quantity {
            return Err(ProductError::InsufficientStock {
                available: self.stock,
                requested: quantity,
            });
        }
        Ok(vec![ProductEvent::stock_decremented(quantity, order_id)])
    }

    pub fn restock(&self, quantity: u32) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_available()?;
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity);
        }
        if self.stock.checked_add(quantity).is_none() {
            return Err(ProductError::Invalid(ValidationErrors::single(
                "quantity",
                format!("stock cannot exceed {}", u32::MAX),
            )));
        }
        Ok(vec![ProductEvent::stock_restocked(quantity)])
    }

    pub fn change_price(&self, price: Money) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_available()?;
        if price.is_negative() {
            return Err(ProductError::Invalid(ValidationErrors::single(
                "price",
                "must not be negative",
            )));
        }
        if price == self.price {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::price_changed(price)])
    }

    pub fn change_cost_price(&self, cost_price: Money) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_available()?;
        if cost_price.is_negative() {
            return Err(ProductError::Invalid(ValidationErrors::single(
                "cost_price",
                "must not be negative",
            )));
        }
        if cost_price == self.cost_price {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::cost_price_changed(cost_price)])
    }

    pub fn delist(&self) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_available()?;
        Ok(vec![ProductEvent::product_delisted()])
    }

    fn ensure_available(&self) -> Result<(), ProductError> {
        match self.id {
            None => Err(ProductError::NotListed),
            Some(_) if self.delisted => Err(ProductError::Delisted),
            Some(_) => Ok(()),
        }
    }

    fn apply_listed(&mut self, data: ProductListedData) {
        self.id = Some(data.product_id);
        self.name = data.name;
        self.description = data.description;
        self.category = data.category;
        self.price = data.price;
        self.cost_price = data.cost_price;
        self.stock = data.stock;
        self.sizes = data.sizes;
        self.colors = data.colors;
        self.is_hidden = data.is_hidden;
        self.featured = data.featured;
        self.related = data.related;
        self.listed_at = Some(data.listed_at);
    }
}
