//! Store-wide settings, kept in a single stream.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::money::Money;
use crate::validation::ValidationErrors;

/// Id of the one settings stream.
pub fn settings_id() -> AggregateId {
    AggregateId::from_key("settings", "default")
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings have not been initialized")]
    NotInitialized,

    #[error("Settings already initialized")]
    AlreadyInitialized,

    #[error("{0}")]
    Invalid(ValidationErrors),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SettingsEvent {
    SettingsInitialized(SettingsInitializedData),
    DefaultDeliveryPriceChanged(DefaultDeliveryPriceChangedData),
}

impl DomainEvent for SettingsEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SettingsEvent::SettingsInitialized(_) => "SettingsInitialized",
            SettingsEvent::DefaultDeliveryPriceChanged(_) => "DefaultDeliveryPriceChanged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsInitializedData {
    pub default_delivery_price: Money,
    pub initialized_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultDeliveryPriceChangedData {
    pub from: Money,
    pub to: Money,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    id: Option<AggregateId>,
    #[serde(default)]
    version: Version,
    default_delivery_price: Money,
}

impl Aggregate for Settings {
    type Event = SettingsEvent;
    type Error = SettingsError;

    fn aggregate_type() -> &'static str {
        "Settings"
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

    fn apply(&mut self, event: SettingsEvent) {
        match event {
            SettingsEvent::SettingsInitialized(data) => {
                self.id = Some(settings_id());
                self.default_delivery_price = data.default_delivery_price;
            }
            SettingsEvent::DefaultDeliveryPriceChanged(data) => {
                self.default_delivery_price = data.to;
            }
        }
    }
}

impl Settings {
    pub fn is_initialized(&self) -> bool {
        self.id.is_some()
    }

    pub fn default_delivery_price(&self) -> Money {
        self.default_delivery_price
    }

    /// First write of the settings stream, with a zero delivery price.
    pub fn initialize(&self) -> Result<Vec<SettingsEvent>, SettingsError> {
        if self.is_initialized() {
            return Err(SettingsError::AlreadyInitialized);
        }
        Ok(vec![SettingsEvent::SettingsInitialized(SettingsInitializedData {
            default_delivery_price: Money::ZERO,
            initialized_at: Utc::now(),
        })])
    }

    pub fn change_default_delivery_price(&self, price: Money) -> Result<Vec<SettingsEvent>, SettingsError> {
        if !self.is_initialized() {
            return Err(SettingsError::NotInitialized);
        }
        if price.is_negative() {
            return Err(SettingsError::Invalid(ValidationErrors::single(
                "default_delivery_price",
                "must not be negative",
            )));
        }
        if price == self.default_delivery_price {
            return Ok(vec![]);
        }
        Ok(vec![SettingsEvent::DefaultDeliveryPriceChanged(
            DefaultDeliveryPriceChangedData {
                from: self.default_delivery_price,
                to: price,
                changed_at: Utc::now(),
            },
        )])
    }
}
