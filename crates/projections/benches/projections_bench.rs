use criterion::{Criterion, criterion_group, criterion_main};
use domain::command::stage;
use domain::{
    Address, Email, Money, Order, OrderEvent, OrderId, OrderLine, OrderStatus, PaymentMethod,
    PlaceOrder, ProductId, ShippingInfo,
};
use event_store::{EventStore, InMemoryEventStore, Version};
use projections::{
    OrderBookView, OrderFilter, ProfitReporter, Projection, ProjectionProcessor, ReportPeriod,
};

/// Commits `n` orders, each placed and then moved to processing.
async fn populate_store(store: &InMemoryEventStore, n: usize) {
    let products: Vec<ProductId> = (0..20).map(|_| ProductId::new()).collect();
    for i in 0..n {
        let order_id = OrderId::new();
        let email = Email::parse(&format!("buyer{}@example.com", i % 50)).unwrap();
        let placed = Order::default()
            .place(
                order_id,
                PlaceOrder {
                    owner: None,
                    is_guest_order: true,
                    lines: vec![
                        OrderLine::priced(
                            products[i % products.len()],
                            "Widget",
                            Money::from_cents(1500),
                            Money::from_cents(600),
                            2,
                        ),
                        OrderLine::priced(
                            products[(i + 7) % products.len()],
                            "Gadget",
                            Money::from_cents(4000),
                            Money::from_cents(2500),
                            1,
                        ),
                    ],
                    shipping: ShippingInfo {
                        name: "Bench".into(),
                        email,
                        phone: String::new(),
                        address: Address {
                            street: "1 Loop".into(),
                            city: "Bench".into(),
                            ..Default::default()
                        },
                    },
                    payment_method: PaymentMethod::Card,
                    delivery_price: Money::from_cents(300),
                },
            )
            .unwrap();
        let mut events = placed;
        events.push(OrderEvent::status_changed(
            OrderStatus::Pending,
            OrderStatus::Processing,
        ));
        store
            .append_streams(vec![
                stage::<Order>(order_id.into(), Version::initial(), &events).unwrap(),
            ])
            .await
            .unwrap();
    }
}

fn bench_catch_up(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, 500));

    c.bench_function("projections/order_book_catch_up_1000_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut processor = ProjectionProcessor::new(store.clone());
                processor.register(Box::new(OrderBookView::new()) as Box<dyn Projection>);
                processor.run_catch_up().await.unwrap();
            });
        });
    });
}

fn bench_query_by_email(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let view = OrderBookView::new();
    rt.block_on(async {
        populate_store(&store, 500).await;
        let mut processor = ProjectionProcessor::new(store);
        processor.register(Box::new(view.clone()));
        processor.run_catch_up().await.unwrap();
    });
    let filter = OrderFilter {
        email: Some("buyer7@example.com".into()),
        ..Default::default()
    };

    c.bench_function("projections/order_book_query_by_email", |b| {
        b.iter(|| rt.block_on(view.query(&filter)));
    });
}

fn bench_profit_report(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, 500));
    let reporter = ProfitReporter::new(store);

    c.bench_function("projections/profit_report_500_orders", |b| {
        b.iter(|| rt.block_on(reporter.report(ReportPeriod::LastMonth)).unwrap());
    });
}

criterion_group!(benches, bench_catch_up, bench_query_by_email, bench_profit_report);
criterion_main!(benches);
