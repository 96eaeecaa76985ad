//! Store settings with get-or-initialize semantics.

use domain::settings::SettingsError;
use domain::{
    BulkOutcome, CommandHandler, DomainError, Money, OrderId, OrderService, Settings,
    ValidationErrors, settings_id,
};
use event_store::EventStore;
use serde::Serialize;

use crate::error::{CheckoutError, Result};

/// Result of changing the default delivery price.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsUpdate {
    pub default_delivery_price: Money,
    /// Per-order results when the price was pushed to existing orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<BulkOutcome<OrderId>>,
}

pub struct SettingsResolver<S: EventStore> {
    settings: CommandHandler<S, Settings>,
    orders: OrderService<S>,
}

impl<S: EventStore + Clone> SettingsResolver<S> {
    pub fn new(store: S) -> Self {
        Self {
            settings: CommandHandler::new(store.clone()),
            orders: OrderService::new(store),
        }
    }

    /// The settings, created with a zero delivery price on first use.
    ///
    /// Concurrent first calls race on the same stream; the loser reloads the
    /// winner's instance.
    pub async fn current(&self) -> Result<Settings> {
        let settings = self.settings.load(settings_id()).await?;
        if settings.is_initialized() {
            return Ok(settings);
        }

        match self
            .settings
            .execute(settings_id(), |s| s.initialize())
            .await
        {
            Ok(result) => {
                tracing::info!("settings initialized");
                Ok(result.aggregate)
            }
            Err(e)
                if e.is_conflict()
                    || matches!(e, DomainError::Settings(SettingsError::AlreadyInitialized)) =>
            {
                Ok(self.settings.load(settings_id()).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn default_delivery_price(&self) -> Result<Money> {
        Ok(self.current().await?.default_delivery_price())
    }

    /// Changes the default delivery price.
    ///
    /// With `apply_to_existing`, every live order is then updated one at a
    /// time. That pass is not atomic: the outcome lists which orders were
    /// updated and which failed.
    #[tracing::instrument(skip(self))]
    pub async fn set_default_delivery_price(
        &self,
        price: Money,
        apply_to_existing: bool,
    ) -> Result<SettingsUpdate> {
        if price.is_negative() {
            return Err(CheckoutError::Validation(ValidationErrors::single(
                "default_delivery_price",
                "must not be negative",
            )));
        }
        self.current().await?;
        let result = self
            .settings
            .execute(settings_id(), |s| s.change_default_delivery_price(price))
            .await?;

        let applied = if apply_to_existing {
            Some(self.apply_to_orders(price).await?)
        } else {
            None
        };

        Ok(SettingsUpdate {
            default_delivery_price: result.aggregate.default_delivery_price(),
            applied,
        })
    }

    async fn apply_to_orders(&self, price: Money) -> Result<BulkOutcome<OrderId>> {
        let mut outcome = BulkOutcome::new();
        for order in self.orders.list_orders().await? {
            let Some(order_id) = order.order_id() else {
                continue;
            };
            match self.orders.change_delivery_price(order_id, price).await {
                Ok(_) => outcome.record_success(order_id),
                Err(e) => {
                    tracing::warn!(%order_id, error = %e, "delivery price not applied");
                    outcome.record_failure(order_id, e);
                }
            }
        }
        tracing::info!(
            updated = outcome.updated_count(),
            failed = outcome.failed_count(),
            "delivery price applied to existing orders"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;

    #[tokio::test]
    async fn first_read_initializes_to_zero() {
        let store = InMemoryEventStore::new();
        let resolver = SettingsResolver::new(store.clone());

        assert_eq!(resolver.default_delivery_price().await.unwrap(), Money::ZERO);
        assert_eq!(store.event_count().await, 1);

        resolver.default_delivery_price().await.unwrap();
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_reads_share_one_instance() {
        let store = InMemoryEventStore::new();
        let a = SettingsResolver::new(store.clone());
        let b = SettingsResolver::new(store.clone());

        let (x, y) = tokio::join!(a.current(), b.current());
        assert!(x.unwrap().is_initialized());
        assert!(y.unwrap().is_initialized());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let resolver = SettingsResolver::new(InMemoryEventStore::new());
        let result = resolver
            .set_default_delivery_price(Money::from_cents(-100), false)
            .await;
        assert!(matches!(result, Err(CheckoutError::Validation(_))));
    }

    #[tokio::test]
    async fn new_default_is_returned() {
        let resolver = SettingsResolver::new(InMemoryEventStore::new());
        let update = resolver
            .set_default_delivery_price(Money::from_dollars(4), false)
            .await
            .unwrap();

        assert_eq!(update.default_delivery_price, Money::from_dollars(4));
        assert!(update.applied.is_none());
        assert_eq!(
            resolver.default_delivery_price().await.unwrap(),
            Money::from_dollars(4)
        );
    }
}
