//! Order reads and single-order updates.

use event_store::EventStore;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::ids::{OrderId, UserId};
use crate::money::Money;

use super::{Order, OrderStatus, PaymentStatus};

/// Loads orders and applies administrative changes one order at a time.
///
/// Placing orders touches several streams at once and lives with the
/// checkout workflow, not here.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// A placed order that has not been deleted.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        match self.handler.load_existing(order_id.into()).await? {
            Some(order) if !order.is_deleted() => Ok(order),
            _ => Err(DomainError::not_found("Order", order_id)),
        }
    }

    /// Every live order, oldest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        let orders = self.handler.load_all().await?;
        Ok(orders.into_iter().filter(|o| !o.is_deleted()).collect())
    }

    pub async fn orders_owned_by(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        let orders = self.list_orders().await?;
        Ok(orders.into_iter().filter(|o| o.is_owned_by(user_id)).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.get_order(order_id).await?;
        self.handler
            .execute(order_id.into(), |order| order.change_status(status))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_payment_status(
        &self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.get_order(order_id).await?;
        self.handler
            .execute(order_id.into(), |order| order.change_payment_status(status))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_delivery_price(
        &self,
        order_id: OrderId,
        delivery_price: Money,
    ) -> Result<CommandResult<Order>, DomainError> {
        self.get_order(order_id).await?;
        self.handler
            .execute(order_id.into(), |order| {
                order.change_delivery_price(delivery_price)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, order_id: OrderId) -> Result<CommandResult<Order>, DomainError> {
        self.get_order(order_id).await?;
        let result = self
            .handler
            .execute(order_id.into(), |order| order.delete())
            .await?;
        tracing::info!(%order_id, "order deleted");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::stage;
    use crate::contact::{Address, Email, ShippingInfo};
    use crate::ids::ProductId;
    use crate::order::{OrderLine, PaymentMethod, PlaceOrder};
    use event_store::{InMemoryEventStore, Version};

    async fn seed(store: &InMemoryEventStore) -> OrderId {
        let order_id = OrderId::new();
        let events = Order::default()
            .place(
                order_id,
                PlaceOrder {
                    owner: None,
                    is_guest_order: true,
                    lines: vec![OrderLine::priced(
                        ProductId::new(),
                        "Cap",
                        Money::from_dollars(20),
                        Money::from_dollars(8),
                        1,
                    )],
                    shipping: ShippingInfo {
                        name: "Lin".into(),
                        email: Email::parse("lin@example.com").unwrap(),
                        phone: String::new(),
                        address: Address {
                            street: "2 Elm".into(),
                            city: "Oslo".into(),
                            ..Default::default()
                        },
                    },
                    payment_method: PaymentMethod::Card,
                    delivery_price: Money::from_dollars(2),
                },
            )
            .unwrap();
        let write = stage::<Order>(order_id.into(), Version::initial(), &events).unwrap();
        store.append_streams(vec![write]).await.unwrap();
        order_id
    }

    #[tokio::test]
    async fn deleted_orders_are_not_found() {
        let store = InMemoryEventStore::new();
        let orders = OrderService::new(store.clone());
        let id = seed(&store).await;

        orders.delete(id).await.unwrap();

        assert!(matches!(
            orders.get_order(id).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(orders.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_moves_along_the_graph() {
        let store = InMemoryEventStore::new();
        let orders = OrderService::new(store.clone());
        let id = seed(&store).await;

        orders.change_status(id, OrderStatus::Processing).await.unwrap();
        let result = orders.change_status(id, OrderStatus::Pending).await;
        assert!(matches!(result, Err(DomainError::Order(_))));
        assert_eq!(
            orders.get_order(id).await.unwrap().status(),
            OrderStatus::Processing
        );
    }

    #[tokio::test]
    async fn delivery_price_update_keeps_items_price() {
        let store = InMemoryEventStore::new();
        let orders = OrderService::new(store.clone());
        let id = seed(&store).await;

        let result = orders
            .change_delivery_price(id, Money::from_dollars(5))
            .await
            .unwrap();
        assert_eq!(result.aggregate.total_price(), Money::from_dollars(25));
    }
}
