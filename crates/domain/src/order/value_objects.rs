//! Value objects frozen into an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::costing::LineCost;
use crate::ids::ProductId;
use crate::money::Money;
use crate::product::Product;

use super::{PaymentMethod, PaymentStatus};

/// One product line of an order, with the price and cost in force when
/// the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub line_cost: Money,
    pub line_profit: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl OrderLine {
    /// Snapshots `product` at its current price and cost.
    pub fn for_product(
        product: &Product,
        product_id: ProductId,
        quantity: u32,
        size: Option<String>,
        color: Option<String>,
    ) -> Self {
        Self {
            size,
            color,
            ..Self::priced(
                product_id,
                product.name(),
                product.price(),
                product.cost_price(),
                quantity,
            )
        }
    }

    pub fn priced(
        product_id: ProductId,
        name: &str,
        unit_price: Money,
        unit_cost: Money,
        quantity: u32,
    ) -> Self {
        let cost = LineCost::compute(unit_price, unit_cost, quantity);
        Self {
            product_id,
            name: name.to_string(),
            quantity,
            unit_price,
            unit_cost,
            line_cost: cost.cost,
            line_profit: cost.profit,
            size: None,
            color: None,
        }
    }

    /// Revenue of the line.
    pub fn price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_freezes_cost_and_profit() {
        let line = OrderLine::priced(
            ProductId::new(),
            "Tee",
            Money::from_dollars(25),
            Money::from_dollars(10),
            2,
        );
        assert_eq!(line.price(), Money::from_dollars(50));
        assert_eq!(line.line_cost + line.line_profit, line.price());
    }

    #[test]
    fn variant_selection_is_omitted_when_absent() {
        let line = OrderLine::priced(ProductId::new(), "Mug", Money::from_dollars(5), Money::ZERO, 1);
        let json = serde_json::to_value(&line).unwrap();
        assert!(json.get("size").is_none());
    }
}
