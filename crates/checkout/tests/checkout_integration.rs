//! End-to-end checkout, registration and order administration.

use checkout::{
    Caller, CartItem, CartSubmission, CheckoutCoordinator, CheckoutError, InMemoryNotifier,
    NotificationDispatcher, OrderAdmin, OrderUpdate, Registrar, Registration, Sent,
    SettingsResolver, ShippingDetails,
};
use domain::{
    AccountService, Address, CatalogService, Email, Money, NewProduct, OrderId, OrderService,
    OrderStatus, PaymentMethod, ProductId, UserId,
};
use event_store::InMemoryEventStore;

struct TestHarness {
    store: InMemoryEventStore,
    checkout: CheckoutCoordinator<InMemoryEventStore>,
    registrar: Registrar<InMemoryEventStore>,
    admin_ops: OrderAdmin<InMemoryEventStore>,
    catalog: CatalogService<InMemoryEventStore>,
    settings: SettingsResolver<InMemoryEventStore>,
    notifier: InMemoryNotifier,
    dispatcher: NotificationDispatcher,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryEventStore::new();
        let notifier = InMemoryNotifier::new();
        let (dispatcher, _task) = NotificationDispatcher::spawn(notifier.clone());

        Self {
            checkout: CheckoutCoordinator::new(store.clone(), dispatcher.clone()),
            registrar: Registrar::new(store.clone(), dispatcher.clone()),
            admin_ops: OrderAdmin::new(store.clone(), dispatcher.clone()),
            catalog: CatalogService::new(store.clone()),
            settings: SettingsResolver::new(store.clone()),
            store,
            notifier,
            dispatcher,
        }
    }

    async fn product(&self, price: i64, cost: i64, stock: u32, sizes: &[&str]) -> ProductId {
        self.catalog
            .list_product(NewProduct {
                name: format!("Item {price}"),
                price: Money::from_dollars(price),
                cost_price: Some(Money::from_dollars(cost)),
                stock,
                sizes: sizes.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            })
            .await
            .unwrap()
            .product_id()
            .unwrap()
    }

    async fn stock(&self, product_id: ProductId) -> u32 {
        self.catalog.get_product(product_id).await.unwrap().stock()
    }
}

fn line(product_id: ProductId, quantity: u32) -> CartItem {
    CartItem {
        product_id,
        quantity,
        size: None,
        color: None,
        unit_price: None,
    }
}

fn cart(email: &str, items: Vec<CartItem>, delivery_price: Option<Money>) -> CartSubmission {
    CartSubmission {
        items,
        shipping: ShippingDetails {
            name: "Mika Tan".into(),
            email: email.into(),
            phone: "555-0199".into(),
            address: Address {
                street: "12 Harbour St".into(),
                city: "Hobart".into(),
                ..Default::default()
            },
        },
        payment_method: PaymentMethod::CashOnDelivery,
        delivery_price,
    }
}

fn admin() -> Caller {
    Caller::admin(UserId::for_email(&Email::parse("admin@example.com").unwrap()))
}

#[tokio::test]
async fn totals_for_a_two_product_order() {
    let h = TestHarness::new();
    let a = h.product(25, 10, 5, &[]).await;
    let b = h.product(15, 5, 5, &[]).await;

    let order = h
        .checkout
        .place_order(
            cart(
                "mika@example.com",
                vec![line(a, 2), line(b, 1)],
                Some(Money::from_dollars(3)),
            ),
            None,
        )
        .await
        .unwrap();

    assert_eq!(order.items_price(), Money::from_dollars(65));
    assert_eq!(order.total_price(), Money::from_dollars(68));
    assert_eq!(order.total_cost(), Money::from_dollars(25));
    assert_eq!(order.total_profit(), Money::from_dollars(40));
    assert_eq!(order.total_cost() + order.total_profit(), order.items_price());
    assert_eq!(h.stock(a).await, 3);
    assert_eq!(h.stock(b).await, 4);
}

#[tokio::test]
async fn omitted_delivery_price_uses_store_default() {
    let h = TestHarness::new();
    let a = h.product(10, 4, 10, &[]).await;
    h.settings
        .set_default_delivery_price(Money::from_dollars(4), false)
        .await
        .unwrap();

    let defaulted = h
        .checkout
        .place_order(cart("mika@example.com", vec![line(a, 1)], None), None)
        .await
        .unwrap();
    assert_eq!(defaulted.delivery_price(), Money::from_dollars(4));

    let free = h
        .checkout
        .place_order(
            cart("mika@example.com", vec![line(a, 1)], Some(Money::ZERO)),
            None,
        )
        .await
        .unwrap();
    assert_eq!(free.delivery_price(), Money::ZERO);
    assert_eq!(free.total_price(), Money::from_dollars(10));
}

#[tokio::test]
async fn last_unit_goes_to_exactly_one_buyer() {
    let h = TestHarness::new();
    let a = h.product(30, 12, 1, &[]).await;

    let (first, second) = tokio::join!(
        h.checkout
            .place_order(cart("one@example.com", vec![line(a, 1)], None), None),
        h.checkout
            .place_order(cart("two@example.com", vec![line(a, 1)], None), None),
    );

    let results = [first, second];
    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(CheckoutError::InsufficientStock { .. }) | Err(CheckoutError::Conflict(_))
    )));
    assert_eq!(h.stock(a).await, 0);
    assert_eq!(
        OrderService::new(h.store.clone())
            .list_orders()
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn failed_checks_leave_stock_and_orders_alone() {
    let h = TestHarness::new();
    let plain = h.product(10, 4, 5, &[]).await;
    let sized = h.product(20, 8, 5, &["S", "M"]).await;

    let err = h
        .checkout
        .place_order(
            cart("mika@example.com", vec![line(plain, 2), line(sized, 9)], None),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InsufficientStock { available: 5, requested: 9, .. }));

    let err = h
        .checkout
        .place_order(
            cart("mika@example.com", vec![line(plain, 2), line(sized, 1)], None),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::VariantRequired { ref missing, .. } if missing == "size"));

    let err = h
        .checkout
        .place_order(
            cart("mika@example.com", vec![line(ProductId::new(), 1)], None),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::ProductNotFound(_)));

    assert_eq!(h.stock(plain).await, 5);
    assert_eq!(h.stock(sized).await, 5);
    assert!(
        OrderService::new(h.store.clone())
            .list_orders()
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn registration_takes_over_guest_orders() {
    let h = TestHarness::new();
    let a = h.product(18, 6, 10, &[]).await;

    let guest_order = h
        .checkout
        .place_order(cart(" Mika@Example.com ", vec![line(a, 2)], None), None)
        .await
        .unwrap();
    assert!(guest_order.is_guest_order());
    assert_eq!(guest_order.owner(), None);
    let order_id = guest_order.order_id().unwrap();

    let registered = h
        .registrar
        .register(Registration {
            email: "mika@example.com".into(),
            password: "longenough".into(),
            name: None,
            phone: None,
            address: None,
        })
        .await
        .unwrap();
    assert_eq!(registered.linked_orders, vec![order_id]);
    assert_eq!(registered.user.name(), "Mika Tan");
    assert_eq!(registered.user.phone(), "555-0199");

    let user_id = registered.user.user_id().unwrap();
    let order = h
        .admin_ops
        .get_order(&Caller::user(user_id), order_id)
        .await
        .unwrap();
    assert_eq!(order.owner(), Some(user_id));
    assert!(!order.is_guest_order());
    assert_eq!(order.shipping(), guest_order.shipping());

    let email = Email::parse("mika@example.com").unwrap();
    let accounts = AccountService::new(h.store.clone());
    assert!(accounts.find_guest(&email).await.unwrap().is_none());

    // Later anonymous checkouts with that email attach to the account.
    let next = h
        .checkout
        .place_order(cart("mika@example.com", vec![line(a, 1)], None), None)
        .await
        .unwrap();
    assert_eq!(next.owner(), Some(user_id));
    assert!(!next.is_guest_order());
}

#[tokio::test]
async fn explicit_registration_details_win_over_guest_details() {
    let h = TestHarness::new();
    let a = h.product(18, 6, 10, &[]).await;
    h.checkout
        .place_order(cart("mika@example.com", vec![line(a, 1)], None), None)
        .await
        .unwrap();

    let registered = h
        .registrar
        .register(Registration {
            email: "mika@example.com".into(),
            password: "longenough".into(),
            name: Some("M. Tan".into()),
            phone: None,
            address: None,
        })
        .await
        .unwrap();
    assert_eq!(registered.user.name(), "M. Tan");
    assert_eq!(registered.user.phone(), "555-0199");
    assert_eq!(
        registered.user.address().map(|a| a.city.as_str()),
        Some("Hobart")
    );
}

#[tokio::test]
async fn cancelled_orders_stay_cancelled() {
    let h = TestHarness::new();
    let a = h.product(10, 4, 5, &[]).await;
    let order_id = h
        .checkout
        .place_order(cart("mika@example.com", vec![line(a, 1)], None), None)
        .await
        .unwrap()
        .order_id()
        .unwrap();

    let cancelled = h
        .admin_ops
        .update_order(
            &admin(),
            order_id,
            OrderUpdate {
                status: Some(OrderStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);

    let err = h
        .admin_ops
        .update_order(
            &admin(),
            order_id,
            OrderUpdate {
                status: Some(OrderStatus::Processing),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    let CheckoutError::Validation(errors) = err else {
        panic!("expected a validation error");
    };
    assert_eq!(errors.fields()[0].field, "status");
}

#[tokio::test]
async fn delivered_orders_record_when() {
    let h = TestHarness::new();
    let a = h.product(10, 4, 5, &[]).await;
    let order_id = h
        .checkout
        .place_order(cart("mika@example.com", vec![line(a, 1)], None), None)
        .await
        .unwrap()
        .order_id()
        .unwrap();

    for status in [OrderStatus::Processing, OrderStatus::Delivered] {
        h.admin_ops
            .update_order(
                &admin(),
                order_id,
                OrderUpdate {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let order = h.admin_ops.get_order(&admin(), order_id).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Delivered);
    assert!(order.delivered_at().is_some());

    h.dispatcher.flush().await;
    let changes = h
        .notifier
        .sent()
        .into_iter()
        .filter(|s| matches!(s, Sent::StatusChange { .. }))
        .count();
    assert_eq!(changes, 2);
}

#[tokio::test]
async fn notification_failures_do_not_fail_the_order() {
    let h = TestHarness::new();
    h.notifier.set_fail_on_confirmation(true);
    h.notifier.set_fail_on_admin_alert(true);
    let a = h.product(10, 4, 5, &[]).await;

    let order = h
        .checkout
        .place_order(cart("mika@example.com", vec![line(a, 1)], None), None)
        .await
        .unwrap();
    h.dispatcher.flush().await;

    assert!(order.order_id().is_some());
    assert!(h.notifier.sent().is_empty());
    assert_eq!(h.stock(a).await, 4);
}

#[tokio::test]
async fn new_default_delivery_price_can_be_pushed_to_existing_orders() {
    let h = TestHarness::new();
    let a = h.product(10, 4, 10, &[]).await;
    let mut order_ids: Vec<OrderId> = Vec::new();
    for _ in 0..3 {
        let order = h
            .checkout
            .place_order(
                cart("mika@example.com", vec![line(a, 1)], Some(Money::from_dollars(2))),
                None,
            )
            .await
            .unwrap();
        order_ids.push(order.order_id().unwrap());
    }

    let update = h
        .settings
        .set_default_delivery_price(Money::from_dollars(5), true)
        .await
        .unwrap();
    let applied = update.applied.unwrap();
    assert_eq!(applied.updated_count(), 3);
    assert_eq!(applied.failed_count(), 0);

    for order_id in order_ids {
        let order = h.admin_ops.get_order(&admin(), order_id).await.unwrap();
        assert_eq!(order.delivery_price(), Money::from_dollars(5));
        assert_eq!(order.total_price(), Money::from_dollars(15));
    }
}

#[tokio::test]
async fn oversized_amounts_are_rejected_not_wrapped() {
    let h = TestHarness::new();
    let a = h.product(10, 4, 10, &[]).await;

    let err = h
        .checkout
        .place_order(
            cart(
                "mika@example.com",
                vec![line(a, 1)],
                Some(Money::from_cents(i64::MAX)),
            ),
            None,
        )
        .await
        .unwrap_err();
    let CheckoutError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors.fields()[0].field, "delivery_price");
    assert_eq!(h.stock(a).await, 10);

    let order = h
        .checkout
        .place_order(cart("mika@example.com", vec![line(a, 1)], None), None)
        .await
        .unwrap();
    let update = h
        .settings
        .set_default_delivery_price(Money::from_cents(i64::MAX), true)
        .await
        .unwrap();
    let applied = update.applied.unwrap();
    assert_eq!(applied.updated_count(), 0);
    assert_eq!(applied.failed_count(), 1);

    let order = h
        .admin_ops
        .get_order(&admin(), order.order_id().unwrap())
        .await
        .unwrap();
    assert_eq!(order.total_price(), Money::from_dollars(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registration_racing_a_guest_checkout_never_orphans_the_order() {
    let h = TestHarness::new();
    let a = h.product(12, 5, 100, &[]).await;
    let accounts = AccountService::new(h.store.clone());

    for round in 0..20 {
        let email = format!("racer{round}@example.com");
        if round % 2 == 0 {
            // Half the rounds start from an existing guest record.
            h.checkout
                .place_order(cart(&email, vec![line(a, 1)], None), None)
                .await
                .unwrap();
        }

        let (registered, placed) = tokio::join!(
            h.registrar.register(Registration {
                email: email.clone(),
                password: "longenough".into(),
                name: None,
                phone: None,
                address: None,
            }),
            h.checkout
                .place_order(cart(&email, vec![line(a, 1)], None), None),
        );
        let user_id = registered.unwrap().user.user_id().unwrap();
        let order_id = placed.unwrap().order_id().unwrap();

        let order = h.admin_ops.get_order(&admin(), order_id).await.unwrap();
        let guest = accounts
            .find_guest(&Email::parse(&email).unwrap())
            .await
            .unwrap();
        let held_by_live_guest = order.is_guest_order()
            && guest.is_some_and(|g| g.order_ids().contains(&order_id));
        assert!(
            order.owner() == Some(user_id) || held_by_live_guest,
            "round {round}: order {order_id} belongs to neither the account nor a live guest"
        );

        // A successful registration supersedes the guest, so every order
        // for the email ends up with the account.
        let mine = h.admin_ops.my_orders(&Caller::user(user_id)).await.unwrap();
        assert!(mine.iter().any(|o| o.order_id() == Some(order_id)));
        assert!(mine.iter().all(|o| !o.is_guest_order()));
    }
}
