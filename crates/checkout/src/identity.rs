//! Deciding who an order belongs to.

use domain::account::GuestEvent;
use domain::command::stage;
use domain::ids::guest_stream_id;
use domain::{AccountService, Aggregate, DomainError, Email, GuestUser, OrderId, ShippingInfo, UserId};
use event_store::{EventStore, StreamWrite};

use crate::caller::Caller;
use crate::error::{CheckoutError, Result};

/// Owner of an order about to be placed.
#[derive(Debug, Clone)]
pub enum Identity {
    /// The signed-in caller, or the account registered under the email.
    Registered(UserId),
    /// No account: the guest record for the email, as loaded. A default
    /// (never created) record means one is created with the order.
    Guest(GuestUser),
}

impl Identity {
    pub fn owner(&self) -> Option<UserId> {
        match self {
            Identity::Registered(user_id) => Some(*user_id),
            Identity::Guest(_) => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest(_))
    }
}

pub struct IdentityReconciler<S: EventStore + Clone> {
    accounts: AccountService<S>,
}

impl<S: EventStore + Clone> IdentityReconciler<S> {
    pub fn new(store: S) -> Self {
        Self {
            accounts: AccountService::new(store),
        }
    }

    pub async fn reconcile(&self, caller: Option<&Caller>, email: &Email) -> Result<Identity> {
        if let Some(caller) = caller {
            return Ok(Identity::Registered(caller.user_id));
        }
        if let Some(user) = self.accounts.find_user(email).await? {
            let user_id = user
                .user_id()
                .ok_or_else(|| DomainError::not_found("User", email))?;
            return Ok(Identity::Registered(user_id));
        }

        let guest = self.accounts.guests().load(guest_stream_id(email)).await?;
        if guest.id().is_some() && !guest.is_live() {
            // Registered between our two reads; the next attempt finds the account.
            return Err(CheckoutError::Conflict(
                "guest record superseded during checkout".into(),
            ));
        }
        Ok(Identity::Guest(guest))
    }
}

/// Guest-side writes for an order: create the guest record if needed, add
/// the order to it, and require that no account exists for the email.
pub fn guest_writes(
    identity: &Identity,
    shipping: &ShippingInfo,
    order_id: OrderId,
) -> Result<Vec<StreamWrite>> {
    let Identity::Guest(guest) = identity else {
        return Ok(Vec::new());
    };

    let mut state = guest.clone();
    let mut events: Vec<GuestEvent> = Vec::new();
    if guest.id().is_none() {
        let created = guest
            .create(
                shipping.email.clone(),
                &shipping.name,
                &shipping.phone,
                shipping.address.clone(),
            )
            .map_err(DomainError::from)?;
        state.apply_events(created.iter().cloned());
        events.extend(created);
    }
    events.extend(state.record_order(order_id).map_err(DomainError::from)?);

    Ok(vec![
        stage::<GuestUser>(guest_stream_id(&shipping.email), guest.version(), &events)?,
        StreamWrite::assert_absent(UserId::for_email(&shipping.email).into()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Address;
    use event_store::InMemoryEventStore;

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            name: "Noor".into(),
            email: Email::parse("noor@example.com").unwrap(),
            phone: "555".into(),
            address: Address {
                street: "4 Bay".into(),
                city: "Cork".into(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn signed_in_caller_owns_the_order() {
        let reconciler = IdentityReconciler::new(InMemoryEventStore::new());
        let caller = Caller::user(UserId::for_email(&Email::parse("me@example.com").unwrap()));

        let identity = reconciler
            .reconcile(Some(&caller), &shipping().email)
            .await
            .unwrap();
        assert_eq!(identity.owner(), Some(caller.user_id));
        assert!(!identity.is_guest());
    }

    #[tokio::test]
    async fn unknown_email_becomes_a_new_guest() {
        let store = InMemoryEventStore::new();
        let reconciler = IdentityReconciler::new(store.clone());

        let identity = reconciler.reconcile(None, &shipping().email).await.unwrap();
        assert!(identity.is_guest());

        let order_id = OrderId::new();
        let writes = guest_writes(&identity, &shipping(), order_id).unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].events.len(), 2);
        store.append_streams(writes).await.unwrap();

        let Identity::Guest(guest) = reconciler.reconcile(None, &shipping().email).await.unwrap()
        else {
            panic!("expected the existing guest");
        };
        assert_eq!(guest.order_ids(), &[order_id]);
        assert_eq!(guest.name(), "Noor");
    }

    #[tokio::test]
    async fn racing_guest_creations_conflict() {
        let store = InMemoryEventStore::new();
        let reconciler = IdentityReconciler::new(store.clone());
        let first = reconciler.reconcile(None, &shipping().email).await.unwrap();
        let second = reconciler.reconcile(None, &shipping().email).await.unwrap();

        store
            .append_streams(guest_writes(&first, &shipping(), OrderId::new()).unwrap())
            .await
            .unwrap();
        let err = store
            .append_streams(guest_writes(&second, &shipping(), OrderId::new()).unwrap())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
