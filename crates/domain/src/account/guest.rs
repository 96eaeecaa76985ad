//! Guest buyers: people who ordered without an account.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::contact::{Address, Email};
use crate::ids::{OrderId, UserId, guest_stream_id};

use super::AccountError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GuestEvent {
    GuestCreated(GuestCreatedData),
    GuestOrderRecorded(GuestOrderRecordedData),
    /// The email registered an account, which took over the guest's orders.
    GuestSuperseded(GuestSupersededData),
}

impl DomainEvent for GuestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GuestEvent::GuestCreated(_) => "GuestCreated",
            GuestEvent::GuestOrderRecorded(_) => "GuestOrderRecorded",
            GuestEvent::GuestSuperseded(_) => "GuestSuperseded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestCreatedData {
    pub email: Email,
    pub name: String,
    pub phone: String,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestOrderRecordedData {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSupersededData {
    pub user_id: UserId,
    pub superseded_at: DateTime<Utc>,
}

/// Contact details of a guest buyer and the orders placed under the email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestUser {
    id: Option<AggregateId>,
    #[serde(default)]
    version: Version,
    email: Option<Email>,
    name: String,
    phone: String,
    address: Address,
    order_ids: Vec<OrderId>,
    superseded_by: Option<UserId>,
}

impl Aggregate for GuestUser {
    type Event = GuestEvent;
    type Error = AccountError;

    fn aggregate_type() -> &'static str {
        "GuestUser"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: GuestEvent) {
        match event {
            GuestEvent::GuestCreated(data) => {
                self.id = Some(guest_stream_id(&data.email));
                self.email = Some(data.email);
                self.name = data.name;
                self.phone = data.phone;
                self.address = data.address;
            }
            GuestEvent::GuestOrderRecorded(data) => self.order_ids.push(data.order_id),
            GuestEvent::GuestSuperseded(data) => self.superseded_by = Some(data.user_id),
        }
    }
}

impl GuestUser {
    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn order_ids(&self) -> &[OrderId] {
        &self.order_ids
    }

    /// Created and not yet taken over by a registered account.
    pub fn is_live(&self) -> bool {
        self.id.is_some() && self.superseded_by.is_none()
    }

    pub fn create(
        &self,
        email: Email,
        name: &str,
        phone: &str,
        address: Address,
    ) -> Result<Vec<GuestEvent>, AccountError> {
        if self.id.is_some() {
            return Err(AccountError::GuestExists);
        }
        Ok(vec![GuestEvent::GuestCreated(GuestCreatedData {
            email,
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            address,
            created_at: Utc::now(),
        })])
    }

    pub fn record_order(&self, order_id: OrderId) -> Result<Vec<GuestEvent>, AccountError> {
        self.ensure_live()?;
        Ok(vec![GuestEvent::GuestOrderRecorded(GuestOrderRecordedData {
            order_id,
        })])
    }

    pub fn supersede(&self, user_id: UserId) -> Result<Vec<GuestEvent>, AccountError> {
        self.ensure_live()?;
        Ok(vec![GuestEvent::GuestSuperseded(GuestSupersededData {
            user_id,
            superseded_at: Utc::now(),
        })])
    }

    fn ensure_live(&self) -> Result<(), AccountError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(AccountError::GuestNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("guest@example.com").unwrap()
    }

    fn created() -> GuestUser {
        let mut guest = GuestUser::default();
        let events = guest
            .create(email(), "Sam", "555", Address::default())
            .unwrap();
        guest.apply_events(events);
        guest
    }

    #[test]
    fn guest_stream_is_keyed_by_email() {
        let guest = created();
        assert_eq!(guest.id(), Some(guest_stream_id(&email())));
        assert!(guest.is_live());
    }

    #[test]
    fn records_orders_until_superseded() {
        let mut guest = created();
        let order = OrderId::new();
        guest.apply_events(guest.record_order(order).unwrap());
        assert_eq!(guest.order_ids(), &[order]);

        guest.apply_events(guest.supersede(UserId::for_email(&email())).unwrap());
        assert!(!guest.is_live());
        assert!(matches!(
            guest.record_order(OrderId::new()),
            Err(AccountError::GuestNotFound)
        ));
    }

    #[test]
    fn creating_twice_is_rejected() {
        let guest = created();
        assert!(matches!(
            guest.create(email(), "Sam", "", Address::default()),
            Err(AccountError::GuestExists)
        ));
    }
}
