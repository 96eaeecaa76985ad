//! Cart submissions as received from the storefront.

use domain::{
    Address, Email, Money, PaymentMethod, ProductId, ShippingInfo, ValidationErrors,
};
use serde::Deserialize;

/// A cart submitted for checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartSubmission {
    pub items: Vec<CartItem>,
    pub shipping: ShippingDetails,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// `None` falls back to the store default; an explicit zero is kept.
    #[serde(default)]
    pub delivery_price: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Price the buyer saw; checked against the catalog when present.
    #[serde(default)]
    pub unit_price: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShippingDetails {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub address: Address,
}

/// A submission that passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidCart {
    pub items: Vec<CartItem>,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub delivery_price: Option<Money>,
}

impl CartSubmission {
    /// Checks shape and contact details, reporting every bad field at once.
    pub fn validate(self) -> Result<ValidCart, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.check(self.items.is_empty(), "items", "must not be empty");
        for (k, item) in self.items.iter().enumerate() {
            errors.check(
                item.quantity == 0,
                format!("items[{k}].quantity"),
                "must be at least 1",
            );
            errors.check(
                item.unit_price.is_some_and(|p| p.is_negative()),
                format!("items[{k}].unit_price"),
                "must not be negative",
            );
        }

        errors.check(
            self.shipping.name.trim().is_empty(),
            "shipping.name",
            "is required",
        );
        let email = Email::parse(&self.shipping.email)
            .map_err(|e| errors.add("shipping.email", e.to_string()))
            .ok();
        self.shipping.address.validate("shipping.address", &mut errors);
        errors.check(
            self.delivery_price.is_some_and(|p| p.is_negative()),
            "delivery_price",
            "must not be negative",
        );

        errors.into_result()?;
        let Some(email) = email else {
            return Err(ValidationErrors::single("shipping.email", "is required"));
        };

        Ok(ValidCart {
            items: self.items,
            shipping: ShippingInfo {
                name: self.shipping.name.trim().to_string(),
                email,
                phone: self.shipping.phone.trim().to_string(),
                address: self.shipping.address,
            },
            payment_method: self.payment_method,
            delivery_price: self.delivery_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(value: serde_json::Value) -> CartSubmission {
        serde_json::from_value(value).unwrap()
    }

    fn shipping() -> serde_json::Value {
        json!({
            "name": "Ada",
            "email": " Ada@Example.com ",
            "address": { "street": "1 Main", "city": "Paris" }
        })
    }

    #[test]
    fn valid_cart_normalizes_email() {
        let cart = submission(json!({
            "items": [{ "product_id": ProductId::new(), "quantity": 2 }],
            "shipping": shipping(),
        }))
        .validate()
        .unwrap();

        assert_eq!(cart.shipping.email.as_str(), "ada@example.com");
        assert_eq!(cart.delivery_price, None);
        assert_eq!(cart.payment_method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn explicit_zero_delivery_is_kept() {
        let cart = submission(json!({
            "items": [{ "product_id": ProductId::new(), "quantity": 1 }],
            "shipping": shipping(),
            "delivery_price": 0,
        }))
        .validate()
        .unwrap();
        assert_eq!(cart.delivery_price, Some(Money::ZERO));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_value::<CartSubmission>(json!({
            "items": [],
            "shipping": shipping(),
            "coupon": "FREE",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn reports_every_bad_field() {
        let errors = submission(json!({
            "items": [{ "product_id": ProductId::new(), "quantity": 0 }],
            "shipping": {
                "name": "",
                "email": "nope",
                "address": { "street": "", "city": "" }
            },
            "delivery_price": -5,
        }))
        .validate()
        .unwrap_err();

        let fields: Vec<_> = errors.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "items[0].quantity",
                "shipping.name",
                "shipping.email",
                "shipping.address.street",
                "shipping.address.city",
                "delivery_price",
            ]
        );
    }
}
