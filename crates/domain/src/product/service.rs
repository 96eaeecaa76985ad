//! Catalog operations over the product stream.

use event_store::EventStore;
use serde::Deserialize;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::ids::ProductId;
use crate::money::Money;
use crate::outcome::BulkOutcome;

use super::{NewProduct, Product};

/// One entry of a bulk cost-price update.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostPriceUpdate {
    pub product_id: ProductId,
    pub cost_price: Money,
}

/// Lists products and manages their prices and stock.
pub struct CatalogService<S: EventStore> {
    handler: CommandHandler<S, Product>,
}

impl<S: EventStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Product> {
        &self.handler
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn list_product(&self, input: NewProduct) -> Result<Product, DomainError> {
        let product_id = ProductId::new();
        let result = self
            .handler
            .execute(product_id.into(), |product| product.list(product_id, input))
            .await?;

        tracing::info!(%product_id, "product listed");
        metrics::counter!("products_listed_total").increment(1);
        Ok(result.aggregate)
    }

    /// A listed product, including delisted ones.
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.handler
            .load_existing(product_id.into())
            .await?
            .ok_or_else(|| DomainError::not_found("Product", product_id))
    }

    /// Every product still in the catalog, oldest first.
    pub async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        let products = self.handler.load_all().await?;
        Ok(products.into_iter().filter(|p| !p.is_delisted()).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn restock(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.get_product(product_id).await?;
        self.handler
            .execute_with_snapshot(product_id.into(), |product| product.restock(quantity))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_price(
        &self,
        product_id: ProductId,
        price: Money,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.get_product(product_id).await?;
        self.handler
            .execute_with_snapshot(product_id.into(), |product| product.change_price(price))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_cost_price(
        &self,
        product_id: ProductId,
        cost_price: Money,
    ) -> Result<CommandResult<Product>, DomainError> {
        self.get_product(product_id).await?;
        self.handler
            .execute_with_snapshot(product_id.into(), |product| {
                product.change_cost_price(cost_price)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delist(&self, product_id: ProductId) -> Result<CommandResult<Product>, DomainError> {
        self.get_product(product_id).await?;
        self.handler
            .execute_with_snapshot(product_id.into(), |product| product.delist())
            .await
    }

    /// Applies each update on its own; one bad entry does not stop the rest.
    ///
    /// Orders already placed keep the cost they recorded.
    #[tracing::instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn bulk_update_cost_prices(
        &self,
        updates: Vec<CostPriceUpdate>,
    ) -> BulkOutcome<ProductId> {
        let mut outcome = BulkOutcome::new();
        for update in updates {
            match self
                .change_cost_price(update.product_id, update.cost_price)
                .await
            {
                Ok(_) => outcome.record_success(update.product_id),
                Err(e) => {
                    tracing::warn!(product_id = %update.product_id, error = %e, "cost price update failed");
                    outcome.record_failure(update.product_id, e);
                }
            }
        }

        tracing::info!(
            updated = outcome.updated_count(),
            failed = outcome.failed_count(),
            "bulk cost price update finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;

    fn catalog() -> CatalogService<InMemoryEventStore> {
        CatalogService::new(InMemoryEventStore::new())
    }

    fn mug() -> NewProduct {
        NewProduct {
            name: "Mug".into(),
            price: Money::from_dollars(12),
            cost_price: Some(Money::from_dollars(4)),
            stock: 3,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn listed_products_can_be_read_back() {
        let catalog = catalog();
        let product = catalog.list_product(mug()).await.unwrap();
        let id = product.product_id().unwrap();

        let loaded = catalog.get_product(id).await.unwrap();
        assert_eq!(loaded.name(), "Mug");
        assert_eq!(catalog.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let result = catalog().restock(ProductId::new(), 1).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delisted_products_drop_out_of_listing() {
        let catalog = catalog();
        let id = catalog.list_product(mug()).await.unwrap().product_id().unwrap();
        catalog.delist(id).await.unwrap();

        assert!(catalog.list_products().await.unwrap().is_empty());
        assert!(catalog.get_product(id).await.unwrap().is_delisted());
    }

    #[tokio::test]
    async fn bulk_cost_update_reports_each_entry() {
        let catalog = catalog();
        let id = catalog.list_product(mug()).await.unwrap().product_id().unwrap();
        let missing = ProductId::new();

        let outcome = catalog
            .bulk_update_cost_prices(vec![
                CostPriceUpdate {
                    product_id: missing,
                    cost_price: Money::from_dollars(1),
                },
                CostPriceUpdate {
                    product_id: id,
                    cost_price: Money::from_dollars(5),
                },
                CostPriceUpdate {
                    product_id: id,
                    cost_price: Money::from_cents(-5),
                },
            ])
            .await;

        assert_eq!(outcome.updated, vec![id]);
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.failed[0].id, missing);
        assert_eq!(
            catalog.get_product(id).await.unwrap().cost_price(),
            Money::from_dollars(5)
        );
    }
}
