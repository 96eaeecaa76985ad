//! Order placement across orders, products and identity records.

use std::collections::HashMap;

use domain::command::stage;
use domain::{
    Aggregate, CommandHandler, DomainError, Money, Order, OrderId, PlaceOrder, Product, ProductId,
};
use event_store::{EventStore, Version};

use crate::caller::Caller;
use crate::cart::{CartSubmission, ValidCart};
use crate::error::{CheckoutError, Result};
use crate::identity::{self, IdentityReconciler};
use crate::inventory;
use crate::notifications::{Notification, NotificationDispatcher};
use crate::settings::SettingsResolver;

/// Commit attempts before a contended checkout gives up.
pub const MAX_ATTEMPTS: usize = 5;

/// Places orders.
///
/// Every attempt reads the products and the buyer's records, then commits the
/// order, one stock decrement per product and the guest bookkeeping in a
/// single multi-stream append. If any of those streams moved since the read,
/// nothing is written and the attempt is retried against fresh state; stock
/// therefore never goes below zero however many buyers race for it.
pub struct CheckoutCoordinator<S: EventStore + Clone> {
    store: S,
    products: CommandHandler<S, Product>,
    identity: IdentityReconciler<S>,
    settings: SettingsResolver<S>,
    notifications: NotificationDispatcher,
    max_attempts: usize,
}

impl<S: EventStore + Clone> CheckoutCoordinator<S> {
    pub fn new(store: S, notifications: NotificationDispatcher) -> Self {
        Self {
            products: CommandHandler::new(store.clone()),
            identity: IdentityReconciler::new(store.clone()),
            settings: SettingsResolver::new(store.clone()),
            store,
            notifications,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[tracing::instrument(skip(self, submission), fields(items = submission.items.len()))]
    pub async fn place_order(
        &self,
        submission: CartSubmission,
        caller: Option<&Caller>,
    ) -> Result<Order> {
        let started = std::time::Instant::now();
        let cart = submission.validate()?;
        let delivery_price = match cart.delivery_price {
            Some(price) => price,
            None => self.settings.default_delivery_price().await?,
        };
        let order_id = OrderId::new();

        for attempt in 1..=self.max_attempts {
            match self.attempt(&cart, order_id, delivery_price, caller).await {
                Ok(order) => {
                    metrics::counter!("orders_placed_total").increment(1);
                    metrics::histogram!("checkout_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::info!(
                        %order_id,
                        attempt,
                        guest = order.is_guest_order(),
                        total = %order.total_price(),
                        "order placed"
                    );
                    self.notifications
                        .dispatch(Notification::OrderPlaced(order.clone()));
                    return Ok(order);
                }
                Err(e) if e.is_conflict() => {
                    metrics::counter!("order_commit_conflicts_total").increment(1);
                    tracing::warn!(%order_id, attempt, error = %e, "order commit conflict, retrying");
                }
                Err(e) => {
                    metrics::counter!("checkout_rejections_total", "reason" => e.kind())
                        .increment(1);
                    tracing::info!(%order_id, error = %e, "order rejected");
                    return Err(e);
                }
            }
        }

        metrics::counter!("checkout_rejections_total", "reason" => "conflict").increment(1);
        Err(CheckoutError::Conflict(format!(
            "order could not be committed after {} attempts",
            self.max_attempts
        )))
    }

    async fn attempt(
        &self,
        cart: &ValidCart,
        order_id: OrderId,
        delivery_price: Money,
        caller: Option<&Caller>,
    ) -> Result<Order> {
        let identity = self
            .identity
            .reconcile(caller, &cart.shipping.email)
            .await?;

        let mut products: HashMap<ProductId, Product> = HashMap::new();
        for item in &cart.items {
            if !products.contains_key(&item.product_id) {
                let product = self.products.load(item.product_id.into()).await?;
                products.insert(item.product_id, product);
            }
        }
        let checked = inventory::check_cart(&cart.items, &products)?;

        let mut order = Order::default();
        let order_events = order
            .place(
                order_id,
                PlaceOrder {
                    owner: identity.owner(),
                    is_guest_order: identity.is_guest(),
                    lines: checked.lines,
                    shipping: cart.shipping.clone(),
                    payment_method: cart.payment_method,
                    delivery_price,
                },
            )
            .map_err(DomainError::from)?;

        let mut writes = vec![stage::<Order>(
            order_id.into(),
            Version::initial(),
            &order_events,
        )?];
        let mut decremented = Vec::with_capacity(checked.decrements.len());
        for (product_id, quantity) in checked.decrements {
            let mut product = products
                .remove(&product_id)
                .ok_or(CheckoutError::ProductNotFound(product_id))?;
            let events = product
                .decrement_stock(quantity, order_id.into())
                .map_err(DomainError::from)?;
            writes.push(stage::<Product>(
                product_id.into(),
                product.version(),
                &events,
            )?);
            let next = Version::new(product.version().as_i64() + events.len() as i64);
            product.apply_events(events);
            product.set_version(next);
            decremented.push((product_id, product));
        }
        writes.extend(identity::guest_writes(&identity, &cart.shipping, order_id)?);

        self.store.append_streams(writes).await?;

        for (product_id, product) in &decremented {
            if let Err(e) = self
                .products
                .snapshot_if_due((*product_id).into(), product)
                .await
            {
                tracing::warn!(%product_id, error = %e, "product snapshot failed");
            }
        }

        let placed_version = Version::new(order_events.len() as i64);
        order.apply_events(order_events);
        order.set_version(placed_version);
        Ok(order)
    }
}
