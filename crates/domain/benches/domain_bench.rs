use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Address, CatalogService, Email, Money, NewProduct, OrderLine, OrderTotals, ProductId,
    ShippingInfo, command::stage, order::PlaceOrder, rank_products,
};
use domain::{Order, OrderService, PaymentMethod};
use event_store::{EventStore, InMemoryEventStore, Version};

fn lines(count: u32) -> Vec<OrderLine> {
    (0..count)
        .map(|i| {
            OrderLine::priced(
                ProductId::new(),
                "Widget",
                Money::from_cents(1_000 + i64::from(i)),
                Money::from_cents(400),
                1 + i % 3,
            )
        })
        .collect()
}

fn bench_cost_calculator(c: &mut Criterion) {
    let small = lines(5);
    let large = lines(200);

    c.bench_function("domain/order_totals_5_lines", |b| {
        b.iter(|| OrderTotals::from_lines(&small));
    });

    c.bench_function("domain/rank_products_200_lines", |b| {
        b.iter(|| rank_products(&large, |_| true));
    });
}

fn bench_restock(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let catalog = CatalogService::new(InMemoryEventStore::new());
    let product_id = rt.block_on(async {
        catalog
            .list_product(NewProduct {
                name: "Bench tee".into(),
                price: Money::from_dollars(20),
                ..Default::default()
            })
            .await
            .unwrap()
            .product_id()
            .unwrap()
    });

    // Snapshots kick in every 50 events, so replay cost stays bounded.
    c.bench_function("domain/restock_with_snapshots", |b| {
        b.iter(|| {
            rt.block_on(async { catalog.restock(product_id, 1).await.unwrap() });
        });
    });
}

fn bench_order_replay(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let orders = OrderService::new(store.clone());

    let order_id = rt.block_on(async {
        let order_id = domain::OrderId::new();
        let events = Order::default()
            .place(
                order_id,
                PlaceOrder {
                    owner: None,
                    is_guest_order: true,
                    lines: lines(50),
                    shipping: ShippingInfo {
                        name: "Bench".into(),
                        email: Email::parse("bench@example.com").unwrap(),
                        phone: String::new(),
                        address: Address {
                            street: "1 Loop".into(),
                            city: "Bench".into(),
                            ..Default::default()
                        },
                    },
                    payment_method: PaymentMethod::Card,
                    delivery_price: Money::from_dollars(3),
                },
            )
            .unwrap();
        let write = stage::<Order>(order_id.into(), Version::initial(), &events).unwrap();
        store.append_streams(vec![write]).await.unwrap();

        for cents in 1..=50 {
            orders
                .change_delivery_price(order_id, Money::from_cents(cents))
                .await
                .unwrap();
        }
        order_id
    });

    c.bench_function("domain/replay_order_51_events", |b| {
        b.iter(|| {
            rt.block_on(async { orders.get_order(order_id).await.unwrap() });
        });
    });
}

criterion_group!(
    benches,
    bench_cost_calculator,
    bench_restock,
    bench_order_replay,
);
criterion_main!(benches);
