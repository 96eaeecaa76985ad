//! Inventory purchase ledger.
//!
//! Money spent restocking, subtracted from order profit to give net profit.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::{EventStore, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::ids::PurchaseId;
use crate::money::Money;
use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("Purchase has not been recorded")]
    NotRecorded,

    #[error("Purchase already recorded")]
    AlreadyRecorded,

    #[error("Purchase has been deleted")]
    Deleted,

    #[error("{0}")]
    Invalid(ValidationErrors),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPurchase {
    pub amount: Money,
    /// Defaults to now.
    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub note: String,
}

/// Fields to change on a recorded purchase. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PurchaseAmendment {
    pub amount: Option<Money>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PurchaseEvent {
    PurchaseRecorded(PurchaseRecordedData),
    PurchaseAmended(PurchaseAmendedData),
    PurchaseDeleted(PurchaseDeletedData),
}

impl DomainEvent for PurchaseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseEvent::PurchaseRecorded(_) => "PurchaseRecorded",
            PurchaseEvent::PurchaseAmended(_) => "PurchaseAmended",
            PurchaseEvent::PurchaseDeleted(_) => "PurchaseDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecordedData {
    pub purchase_id: PurchaseId,
    pub amount: Money,
    pub purchased_at: DateTime<Utc>,
    pub supplier: String,
    pub note: String,
}

/// Full state after the amendment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseAmendedData {
    pub amount: Money,
    pub purchased_at: DateTime<Utc>,
    pub supplier: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseDeletedData {
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryPurchase {
    id: Option<PurchaseId>,
    #[serde(default)]
    version: Version,
    amount: Money,
    purchased_at: Option<DateTime<Utc>>,
    supplier: String,
    note: String,
    deleted: bool,
}

impl Aggregate for InventoryPurchase {
    type Event = PurchaseEvent;
    type Error = PurchaseError;

    fn aggregate_type() -> &'static str {
        "InventoryPurchase"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(Into::into)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: PurchaseEvent) {
        match event {
            PurchaseEvent::PurchaseRecorded(data) => {
                self.id = Some(data.purchase_id);
                self.amount = data.amount;
                self.purchased_at = Some(data.purchased_at);
                self.supplier = data.supplier;
                self.note = data.note;
            }
            PurchaseEvent::PurchaseAmended(data) => {
                self.amount = data.amount;
                self.purchased_at = Some(data.purchased_at);
                self.supplier = data.supplier;
                self.note = data.note;
            }
            PurchaseEvent::PurchaseDeleted(_) => self.deleted = true,
        }
    }
}

impl InventoryPurchase {
    pub fn purchase_id(&self) -> Option<PurchaseId> {
        self.id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn purchased_at(&self) -> Option<DateTime<Utc>> {
        self.purchased_at
    }

    pub fn supplier(&self) -> &str {
        &self.supplier
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// True when the purchase date falls in `[start, end]`.
    pub fn falls_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.purchased_at.is_some_and(|at| at >= start && at <= end)
    }

    pub fn record(&self, purchase_id: PurchaseId, input: NewPurchase) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        if self.id.is_some() {
            return Err(PurchaseError::AlreadyRecorded);
        }
        validate_amount(input.amount)?;
        Ok(vec![PurchaseEvent::PurchaseRecorded(PurchaseRecordedData {
            purchase_id,
            amount: input.amount,
            purchased_at: input.purchased_at.unwrap_or_else(Utc::now),
            supplier: input.supplier.trim().to_string(),
            note: input.note,
        })])
    }

    pub fn amend(&self, change: PurchaseAmendment) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.ensure_live()?;
        let amount = change.amount.unwrap_or(self.amount);
        validate_amount(amount)?;
        Ok(vec![PurchaseEvent::PurchaseAmended(PurchaseAmendedData {
            amount,
            purchased_at: change
                .purchased_at
                .or(self.purchased_at)
                .unwrap_or_else(Utc::now),
            supplier: change.supplier.unwrap_or_else(|| self.supplier.clone()),
            note: change.note.unwrap_or_else(|| self.note.clone()),
        })])
    }

    pub fn delete(&self) -> Result<Vec<PurchaseEvent>, PurchaseError> {
        self.ensure_live()?;
        Ok(vec![PurchaseEvent::PurchaseDeleted(PurchaseDeletedData {
            deleted_at: Utc::now(),
        })])
    }

    fn ensure_live(&self) -> Result<(), PurchaseError> {
        match self.id {
            None => Err(PurchaseError::NotRecorded),
            Some(_) if self.deleted => Err(PurchaseError::Deleted),
            Some(_) => Ok(()),
        }
    }
}

fn validate_amount(amount: Money) -> Result<(), PurchaseError> {
    if amount.is_negative() {
        return Err(PurchaseError::Invalid(ValidationErrors::single(
            "amount",
            "must not be negative",
        )));
    }
    Ok(())
}

/// Records and reads inventory purchases.
pub struct PurchaseLedger<S: EventStore> {
    handler: CommandHandler<S, InventoryPurchase>,
}

impl<S: EventStore> PurchaseLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn record(&self, input: NewPurchase) -> Result<InventoryPurchase, DomainError> {
        let purchase_id = PurchaseId::new();
        let result = self
            .handler
            .execute(purchase_id.into(), |p| p.record(purchase_id, input))
            .await?;
        tracing::info!(%purchase_id, amount = %result.aggregate.amount(), "inventory purchase recorded");
        Ok(result.aggregate)
    }

    pub async fn get(&self, purchase_id: PurchaseId) -> Result<InventoryPurchase, DomainError> {
        match self.handler.load_existing(purchase_id.into()).await? {
            Some(purchase) if !purchase.is_deleted() => Ok(purchase),
            _ => Err(DomainError::not_found("InventoryPurchase", purchase_id)),
        }
    }

    /// Live purchases, optionally restricted to an inclusive date range,
    /// newest first.
    pub async fn list(
        &self,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<InventoryPurchase>, DomainError> {
        let mut purchases: Vec<_> = self
            .handler
            .load_all()
            .await?
            .into_iter()
            .filter(|p| !p.is_deleted())
            .filter(|p| range.is_none_or(|(start, end)| p.falls_within(start, end)))
            .collect();
        purchases.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(purchases)
    }

    #[tracing::instrument(skip(self))]
    pub async fn amend(
        &self,
        purchase_id: PurchaseId,
        change: PurchaseAmendment,
    ) -> Result<CommandResult<InventoryPurchase>, DomainError> {
        self.get(purchase_id).await?;
        self.handler
            .execute(purchase_id.into(), |p| p.amend(change))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, purchase_id: PurchaseId) -> Result<(), DomainError> {
        self.get(purchase_id).await?;
        self.handler
            .execute(purchase_id.into(), |p| p.delete())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use event_store::InMemoryEventStore;

    fn purchase(amount: i64, days_ago: i64) -> NewPurchase {
        NewPurchase {
            amount: Money::from_dollars(amount),
            purchased_at: Some(Utc::now() - Duration::days(days_ago)),
            supplier: "Acme".into(),
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn records_and_lists_by_range() {
        let ledger = PurchaseLedger::new(InMemoryEventStore::new());
        ledger.record(purchase(100, 40)).await.unwrap();
        ledger.record(purchase(30, 2)).await.unwrap();

        assert_eq!(ledger.list(None).await.unwrap().len(), 2);

        let recent = ledger
            .list(Some((Utc::now() - Duration::days(7), Utc::now())))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].amount(), Money::from_dollars(30));
    }

    #[tokio::test]
    async fn negative_amount_is_invalid() {
        let ledger = PurchaseLedger::new(InMemoryEventStore::new());
        let result = ledger.record(purchase(-1, 0)).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn amend_keeps_unchanged_fields() {
        let ledger = PurchaseLedger::new(InMemoryEventStore::new());
        let id = ledger.record(purchase(10, 1)).await.unwrap().purchase_id().unwrap();

        let result = ledger
            .amend(
                id,
                PurchaseAmendment {
                    amount: Some(Money::from_dollars(12)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.aggregate.amount(), Money::from_dollars(12));
        assert_eq!(result.aggregate.supplier(), "Acme");
    }

    #[tokio::test]
    async fn deleted_purchases_disappear() {
        let ledger = PurchaseLedger::new(InMemoryEventStore::new());
        let id = ledger.record(purchase(10, 1)).await.unwrap().purchase_id().unwrap();
        ledger.delete(id).await.unwrap();

        assert!(ledger.list(None).await.unwrap().is_empty());
        assert!(matches!(ledger.get(id).await, Err(DomainError::NotFound { .. })));
        assert!(ledger.delete(id).await.is_err());
    }
}
