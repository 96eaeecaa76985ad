//! Typed identifiers for catalog, order and account streams.

use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::contact::Email;

/// Identifies a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(AggregateId);

impl ProductId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }

    pub fn as_aggregate_id(&self) -> AggregateId {
        self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(AggregateId);

impl OrderId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }

    pub fn as_aggregate_id(&self) -> AggregateId {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies an inventory purchase ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(AggregateId);

impl PurchaseId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for PurchaseId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies a registered account.
///
/// Derived from the normalized email, so an email maps to at most one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(AggregateId);

impl UserId {
    pub fn for_email(email: &Email) -> Self {
        Self(AggregateId::from_key("user", email.as_str()))
    }

    pub fn as_aggregate_id(&self) -> AggregateId {
        self.0
    }
}

/// Stream id of the guest record for an email.
pub fn guest_stream_id(email: &Email) -> AggregateId {
    AggregateId::from_key("guest", email.as_str())
}

macro_rules! aggregate_id_conversions {
    ($($ty:ident),*) => {$(
        impl From<AggregateId> for $ty {
            fn from(id: AggregateId) -> Self {
                Self(id)
            }
        }

        impl From<$ty> for AggregateId {
            fn from(id: $ty) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<AggregateId>().map(Self)
            }
        }
    )*};
}

aggregate_id_conversions!(ProductId, OrderId, PurchaseId, UserId);
