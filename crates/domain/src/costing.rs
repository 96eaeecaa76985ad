//! Cost and profit arithmetic.
//!
//! Costs are frozen into order lines when the order is placed. Everything
//! here works from those frozen values, never from the live catalog.

use std::collections::HashMap;

use serde::Serialize;

use crate::ids::ProductId;
use crate::money::Money;
use crate::order::OrderLine;

/// Number of products listed in a profit ranking.
pub const TOP_PRODUCTS: usize = 10;

/// Ranking key for lines whose product has left the catalog.
pub const UNKNOWN_PRODUCT: &str = "unknown";

/// Revenue, cost and profit of one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCost {
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
}

impl LineCost {
    pub fn compute(unit_price: Money, unit_cost: Money, quantity: u32) -> Self {
        Self {
            revenue: unit_price.multiply(quantity),
            cost: unit_cost.multiply(quantity),
            profit: (unit_price - unit_cost).multiply(quantity),
        }
    }
}

/// Sums over the lines of one order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub items_price: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    pub items_count: u64,
}

impl OrderTotals {
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a OrderLine>) -> Self {
        lines.into_iter().fold(Self::default(), |mut totals, line| {
            totals.items_price += line.price();
            totals.total_cost += line.line_cost;
            totals.total_profit += line.line_profit;
            totals.items_count += u64::from(line.quantity);
            totals
        })
    }

    /// Like [`OrderTotals::from_lines`], but checks every line amount and
    /// every sum. On overflow, returns the index of the offending line.
    pub fn checked_from_lines(lines: &[OrderLine]) -> Result<Self, usize> {
        let mut totals = Self::default();
        for (k, line) in lines.iter().enumerate() {
            let revenue = line.unit_price.checked_mul(line.quantity);
            let cost = line.unit_cost.checked_mul(line.quantity);
            let (Some(revenue), Some(_)) = (revenue, cost) else {
                return Err(k);
            };
            totals.items_price = totals.items_price.checked_add(revenue).ok_or(k)?;
            totals.total_cost = totals.total_cost.checked_add(line.line_cost).ok_or(k)?;
            totals.total_profit = totals.total_profit.checked_add(line.line_profit).ok_or(k)?;
            totals.items_count += u64::from(line.quantity);
        }
        Ok(totals)
    }
}

/// Profit as a percentage of revenue; 0 when there is no revenue.
pub fn profit_margin(profit: Money, revenue: Money) -> f64 {
    profit.percent_of(revenue)
}

/// Aggregated profit for one product across many lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductProfit {
    /// Product id, or [`UNKNOWN_PRODUCT`] when it is no longer listed.
    pub key: String,
    pub name: String,
    pub quantity_sold: u64,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
}

/// Groups line profits by product and keeps the [`TOP_PRODUCTS`] most
/// profitable, highest first.
///
/// `in_catalog` tells whether a product still exists; lines for products
/// that do not are pooled under [`UNKNOWN_PRODUCT`].
pub fn rank_products<'a>(
    lines: impl IntoIterator<Item = &'a OrderLine>,
    in_catalog: impl Fn(ProductId) -> bool,
) -> Vec<ProductProfit> {
    let mut by_key: HashMap<String, ProductProfit> = HashMap::new();

    for line in lines {
        let key = if in_catalog(line.product_id) {
            line.product_id.to_string()
        } else {
            UNKNOWN_PRODUCT.to_string()
        };
        let entry = by_key.entry(key.clone()).or_insert_with(|| ProductProfit {
            name: if key == UNKNOWN_PRODUCT {
                UNKNOWN_PRODUCT.to_string()
            } else {
                line.name.clone()
            },
            key,
            quantity_sold: 0,
            revenue: Money::ZERO,
            cost: Money::ZERO,
            profit: Money::ZERO,
        });
        entry.quantity_sold += u64::from(line.quantity);
        entry.revenue += line.price();
        entry.cost += line.line_cost;
        entry.profit += line.line_profit;
    }

    let mut ranked: Vec<_> = by_key.into_values().collect();
    ranked.sort_by(|a, b| b.profit.cmp(&a.profit).then_with(|| a.key.cmp(&b.key)));
    ranked.truncate(TOP_PRODUCTS);
    ranked
}
