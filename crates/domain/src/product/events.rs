//! Product domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::ids::ProductId;
use crate::money::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    ProductListed(ProductListedData),
    /// Units consumed by an order, recorded in the same commit as the order.
    StockDecremented(StockDecrementedData),
    StockRestocked(StockRestockedData),
    PriceChanged(PriceChangedData),
    /// New cost basis. Orders placed earlier keep the cost they froze.
    CostPriceChanged(CostPriceChangedData),
    ProductDelisted(ProductDelistedData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductListed(_) => "ProductListed",
            ProductEvent::StockDecremented(_) => "StockDecremented",
            ProductEvent::StockRestocked(_) => "StockRestocked",
            ProductEvent::PriceChanged(_) => "PriceChanged",
            ProductEvent::CostPriceChanged(_) => "CostPriceChanged",
            ProductEvent::ProductDelisted(_) => "ProductDelisted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListedData {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub cost_price: Money,
    pub stock: u32,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub is_hidden: bool,
    pub featured: bool,
    pub related: Vec<ProductId>,
    pub listed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDecrementedData {
    pub quantity: u32,
    pub order_id: AggregateId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRestockedData {
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChangedData {
    pub price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostPriceChangedData {
    pub cost_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDelistedData {
    pub delisted_at: DateTime<Utc>,
}

impl ProductEvent {
    pub fn stock_decremented(quantity: u32, order_id: AggregateId) -> Self {
        ProductEvent::StockDecremented(StockDecrementedData { quantity, order_id })
    }

    pub fn stock_restocked(quantity: u32) -> Self {
        ProductEvent::StockRestocked(StockRestockedData { quantity })
    }

    pub fn price_changed(price: Money) -> Self {
        ProductEvent::PriceChanged(PriceChangedData { price })
    }

    pub fn cost_price_changed(cost_price: Money) -> Self {
        ProductEvent::CostPriceChanged(CostPriceChangedData { cost_price })
    }

    pub fn product_delisted() -> Self {
        ProductEvent::ProductDelisted(ProductDelistedData {
            delisted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = ProductEvent::stock_decremented(2, AggregateId::new());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "StockDecremented");
        assert_eq!(json["data"]["quantity"], 2);
        assert_eq!(event.event_type(), "StockDecremented");
    }
}
