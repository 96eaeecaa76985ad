//! Cart lines checked against the catalog.

use std::collections::HashMap;

use domain::{OrderLine, Product, ProductId, ValidationErrors};

use crate::cart::CartItem;
use crate::error::{CheckoutError, Result};

/// Priced lines plus the stock to take from each product.
#[derive(Debug, Clone)]
pub struct CheckedCart {
    pub lines: Vec<OrderLine>,
    /// Total units per product, in order of first appearance.
    pub decrements: Vec<(ProductId, u32)>,
}

/// Checks each line in order and fails on the first problem:
/// unknown product, then stock (counting earlier lines for the same
/// product), then missing variant selections, then a stale unit price.
pub fn check_cart(items: &[CartItem], products: &HashMap<ProductId, Product>) -> Result<CheckedCart> {
    let mut lines = Vec::with_capacity(items.len());
    let mut decrements: Vec<(ProductId, u32)> = Vec::new();

    for (k, item) in items.iter().enumerate() {
        let product = products
            .get(&item.product_id)
            .filter(|p| p.is_available())
            .ok_or(CheckoutError::ProductNotFound(item.product_id))?;

        let requested = match decrements.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, total)) => {
                *total = total.checked_add(item.quantity).ok_or_else(|| {
                    CheckoutError::Validation(ValidationErrors::single(
                        format!("items[{k}].quantity"),
                        "quantity is too large",
                    ))
                })?;
                *total
            }
            None => {
                decrements.push((item.product_id, item.quantity));
                item.quantity
            }
        };
        if product.stock() < requested {
            return Err(CheckoutError::InsufficientStock {
                product_id: item.product_id,
                available: product.stock(),
                requested,
            });
        }

        let missing = product.missing_variants(item.size.as_deref(), item.color.as_deref());
        if !missing.is_empty() {
            return Err(CheckoutError::VariantRequired {
                product_id: item.product_id,
                missing: missing.join(" and "),
            });
        }

        if item.unit_price.is_some_and(|p| p != product.price()) {
            return Err(CheckoutError::Validation(ValidationErrors::single(
                format!("items[{k}].unit_price"),
                format!("price changed to {}", product.price()),
            )));
        }

        if product.price().checked_mul(item.quantity).is_none()
            || product.cost_price().checked_mul(item.quantity).is_none()
        {
            return Err(CheckoutError::Validation(ValidationErrors::single(
                format!("items[{k}].quantity"),
                "line amount is too large",
            )));
        }

        lines.push(OrderLine::for_product(
            product,
            item.product_id,
            item.quantity,
            item.size.clone(),
            item.color.clone(),
        ));
    }

    Ok(CheckedCart { lines, decrements })
}
