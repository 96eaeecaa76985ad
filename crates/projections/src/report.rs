//! Profit reporting over placed orders and inventory purchases.
//!
//! Reports are computed on demand by replaying the order, product and
//! purchase streams. Nothing is cached between calls, so a report always
//! reflects exactly what has been committed.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Months, Utc};
use domain::{
    CommandHandler, InventoryPurchase, Money, Order, OrderStatus, OrderTotals, Product,
    ProductId, ProductProfit, PurchaseLedger, ValidationErrors, profit_margin, rank_products,
};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "period")]
pub enum ReportPeriod {
    LastWeek,
    LastMonth,
    LastYear,
    AllTime,
    /// Inclusive on both ends.
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl ReportPeriod {
    pub const NAMED: [ReportPeriod; 4] = [
        ReportPeriod::LastWeek,
        ReportPeriod::LastMonth,
        ReportPeriod::LastYear,
        ReportPeriod::AllTime,
    ];

    pub fn custom(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(ValidationErrors::single("start", "must not be after end").into());
        }
        Ok(ReportPeriod::Custom { start, end })
    }

    /// Concrete bounds relative to `now`; `None` for all time.
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match *self {
            ReportPeriod::LastWeek => Some((now - Duration::days(7), now)),
            ReportPeriod::LastMonth => Some((now.checked_sub_months(Months::new(1))?, now)),
            ReportPeriod::LastYear => Some((now.checked_sub_months(Months::new(12))?, now)),
            ReportPeriod::AllTime => None,
            ReportPeriod::Custom { start, end } => Some((start, end)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportPeriod::LastWeek => "last_week",
            ReportPeriod::LastMonth => "last_month",
            ReportPeriod::LastYear => "last_year",
            ReportPeriod::AllTime => "all_time",
            ReportPeriod::Custom { .. } => "custom",
        }
    }
}

/// Figures for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    pub profit_margin: f64,
    pub order_count: u64,
    pub items_sold: u64,
    pub top_products: Vec<ProductProfit>,
    pub total_inventory_purchases: Money,
    pub net_profit: Money,
}

/// The requested window plus the four named windows for comparison.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitReport {
    pub generated_at: DateTime<Utc>,
    pub requested: PeriodSummary,
    pub last_week: PeriodSummary,
    pub last_month: PeriodSummary,
    pub last_year: PeriodSummary,
    pub all_time: PeriodSummary,
}

/// Orders count toward revenue unless they were cancelled.
fn counts_toward_revenue(order: &Order) -> bool {
    !order.is_deleted() && order.status() != OrderStatus::Cancelled
}

fn within(at: Option<DateTime<Utc>>, bounds: Option<(DateTime<Utc>, DateTime<Utc>)>) -> bool {
    match bounds {
        None => at.is_some(),
        Some((start, end)) => at.is_some_and(|at| at >= start && at <= end),
    }
}

/// Computes one window's figures from already loaded data.
pub fn summarize(
    period: ReportPeriod,
    now: DateTime<Utc>,
    orders: &[Order],
    purchases: &[InventoryPurchase],
    catalog: &HashSet<ProductId>,
) -> PeriodSummary {
    let bounds = period.bounds(now);
    let included: Vec<&Order> = orders
        .iter()
        .filter(|o| counts_toward_revenue(o) && within(o.placed_at(), bounds))
        .collect();

    let totals = OrderTotals::from_lines(included.iter().flat_map(|o| o.lines()));
    let top_products = rank_products(included.iter().flat_map(|o| o.lines()), |id| {
        catalog.contains(&id)
    });
    let total_inventory_purchases: Money = purchases
        .iter()
        .filter(|p| !p.is_deleted() && within(p.purchased_at(), bounds))
        .map(|p| p.amount())
        .sum();

    PeriodSummary {
        period: period.label(),
        start: bounds.map(|(start, _)| start),
        end: bounds.map(|(_, end)| end),
        total_revenue: totals.items_price,
        total_cost: totals.total_cost,
        total_profit: totals.total_profit,
        profit_margin: profit_margin(totals.total_profit, totals.items_price),
        order_count: included.len() as u64,
        items_sold: totals.items_count,
        top_products,
        total_inventory_purchases,
        net_profit: totals.total_profit - total_inventory_purchases,
    }
}

pub struct ProfitReporter<S: EventStore> {
    orders: CommandHandler<S, Order>,
    products: CommandHandler<S, Product>,
    purchases: PurchaseLedger<S>,
}

impl<S: EventStore + Clone> ProfitReporter<S> {
    pub fn new(store: S) -> Self {
        Self {
            orders: CommandHandler::new(store.clone()),
            products: CommandHandler::new(store.clone()),
            purchases: PurchaseLedger::new(store),
        }
    }

    #[tracing::instrument(skip(self), fields(period = period.label()))]
    pub async fn report(&self, period: ReportPeriod) -> Result<ProfitReport> {
        let started = std::time::Instant::now();
        let now = Utc::now();

        let orders = self.orders.load_all().await?;
        let purchases = self.purchases.list(None).await?;
        let catalog: HashSet<ProductId> = self
            .products
            .load_all()
            .await?
            .iter()
            .filter(|p| !p.is_delisted())
            .filter_map(Product::product_id)
            .collect();

        let [last_week, last_month, last_year, all_time] =
            ReportPeriod::NAMED.map(|named| summarize(named, now, &orders, &purchases, &catalog));
        let requested = match period {
            ReportPeriod::LastWeek => last_week.clone(),
            ReportPeriod::LastMonth => last_month.clone(),
            ReportPeriod::LastYear => last_year.clone(),
            ReportPeriod::AllTime => all_time.clone(),
            ReportPeriod::Custom { .. } => summarize(period, now, &orders, &purchases, &catalog),
        };

        metrics::histogram!("profit_report_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(
            orders = orders.len(),
            purchases = purchases.len(),
            "profit report computed"
        );

        Ok(ProfitReport {
            generated_at: now,
            requested,
            last_week,
            last_month,
            last_year,
            all_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        Address, Aggregate, Email, NewPurchase, OrderId, OrderLine, PaymentMethod, PlaceOrder,
        PurchaseId, ShippingInfo,
    };

    fn order(lines: Vec<OrderLine>, placed_days_ago: i64, now: DateTime<Utc>) -> Order {
        let mut order = Order::default();
        let mut events = order
            .place(
                OrderId::new(),
                PlaceOrder {
                    owner: None,
                    is_guest_order: true,
                    lines,
                    shipping: ShippingInfo {
                        name: "Ira".into(),
                        email: Email::parse("ira@example.com").unwrap(),
                        phone: String::new(),
                        address: Address {
                            street: "5 Elm".into(),
                            city: "Oslo".into(),
                            ..Default::default()
                        },
                    },
                    payment_method: PaymentMethod::CashOnDelivery,
                    delivery_price: Money::from_dollars(3),
                },
            )
            .unwrap();
        if let domain::OrderEvent::OrderPlaced(data) = &mut events[0] {
            data.placed_at = now - Duration::days(placed_days_ago);
        }
        order.apply_events(events);
        order
    }

    fn line(product_id: ProductId, price: i64, cost: i64, quantity: u32) -> OrderLine {
        OrderLine::priced(
            product_id,
            "thing",
            Money::from_dollars(price),
            Money::from_dollars(cost),
            quantity,
        )
    }

    fn purchase(amount: i64, days_ago: i64, now: DateTime<Utc>) -> InventoryPurchase {
        let mut purchase = InventoryPurchase::default();
        let events = purchase
            .record(
                PurchaseId::new(),
                NewPurchase {
                    amount: Money::from_dollars(amount),
                    purchased_at: Some(now - Duration::days(days_ago)),
                    supplier: "Acme".into(),
                    note: String::new(),
                },
            )
            .unwrap();
        purchase.apply_events(events);
        purchase
    }

    #[test]
    fn worked_example_totals() {
        let now = Utc::now();
        let a = ProductId::new();
        let b = ProductId::new();
        let orders = vec![order(vec![line(a, 25, 10, 2), line(b, 15, 5, 1)], 1, now)];
        let catalog = HashSet::from([a, b]);

        let summary = summarize(ReportPeriod::AllTime, now, &orders, &[], &catalog);
        assert_eq!(summary.total_revenue, Money::from_dollars(65));
        assert_eq!(summary.total_cost, Money::from_dollars(25));
        assert_eq!(summary.total_profit, Money::from_dollars(40));
        assert_eq!(summary.order_count, 1);
        assert_eq!(summary.items_sold, 3);
        assert_eq!(summary.top_products[0].key, a.to_string());
        assert_eq!(summary.top_products[0].profit, Money::from_dollars(30));
    }

    #[test]
    fn empty_period_has_zero_margin() {
        let summary = summarize(ReportPeriod::LastWeek, Utc::now(), &[], &[], &HashSet::new());
        assert_eq!(summary.total_revenue, Money::ZERO);
        assert_eq!(summary.profit_margin, 0.0);
        assert!(summary.top_products.is_empty());
    }

    #[test]
    fn windows_select_by_placement_date() {
        let now = Utc::now();
        let p = ProductId::new();
        let orders = vec![
            order(vec![line(p, 10, 4, 1)], 2, now),
            order(vec![line(p, 10, 4, 1)], 20, now),
            order(vec![line(p, 10, 4, 1)], 200, now),
            order(vec![line(p, 10, 4, 1)], 800, now),
        ];
        let catalog = HashSet::from([p]);
        let count = |period| summarize(period, now, &orders, &[], &catalog).order_count;

        assert_eq!(count(ReportPeriod::LastWeek), 1);
        assert_eq!(count(ReportPeriod::LastMonth), 2);
        assert_eq!(count(ReportPeriod::LastYear), 3);
        assert_eq!(count(ReportPeriod::AllTime), 4);
        let custom = ReportPeriod::custom(now - Duration::days(30), now - Duration::days(10)).unwrap();
        assert_eq!(count(custom), 1);
    }

    #[test]
    fn purchases_reduce_net_profit() {
        let now = Utc::now();
        let p = ProductId::new();
        let orders = vec![order(vec![line(p, 50, 20, 2)], 1, now)];
        let purchases = vec![purchase(25, 3, now), purchase(100, 90, now)];

        let week = summarize(ReportPeriod::LastWeek, now, &orders, &purchases, &HashSet::from([p]));
        assert_eq!(week.total_inventory_purchases, Money::from_dollars(25));
        assert_eq!(week.net_profit, Money::from_dollars(35));

        let all = summarize(ReportPeriod::AllTime, now, &orders, &purchases, &HashSet::from([p]));
        assert_eq!(all.net_profit, Money::from_dollars(-65));
    }

    #[test]
    fn delisted_products_pool_under_unknown() {
        let now = Utc::now();
        let gone = ProductId::new();
        let also_gone = ProductId::new();
        let orders = vec![order(vec![line(gone, 10, 4, 1), line(also_gone, 8, 2, 1)], 1, now)];

        let summary = summarize(ReportPeriod::AllTime, now, &orders, &[], &HashSet::new());
        assert_eq!(summary.top_products.len(), 1);
        assert_eq!(summary.top_products[0].key, domain::costing::UNKNOWN_PRODUCT);
        assert_eq!(summary.top_products[0].profit, Money::from_dollars(12));
    }

    #[test]
    fn cancelled_orders_are_left_out() {
        let now = Utc::now();
        let p = ProductId::new();
        let mut cancelled = order(vec![line(p, 10, 4, 1)], 1, now);
        let events = cancelled.change_status(OrderStatus::Cancelled).unwrap();
        cancelled.apply_events(events);
        let orders = vec![cancelled, order(vec![line(p, 10, 4, 2)], 1, now)];

        let summary = summarize(ReportPeriod::AllTime, now, &orders, &[], &HashSet::from([p]));
        assert_eq!(summary.order_count, 1);
        assert_eq!(summary.total_revenue, Money::from_dollars(20));
    }

    #[test]
    fn custom_range_must_be_ordered() {
        let now = Utc::now();
        assert!(ReportPeriod::custom(now, now - Duration::days(1)).is_err());
        assert!(ReportPeriod::custom(now, now).is_ok());
    }
}
