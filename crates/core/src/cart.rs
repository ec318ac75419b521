//! Cart arithmetic.
//!
//! A [`Cart`] is an ordered list of lines, at most one per product. Each line
//! snapshots the product's name, price and image when it is first added; the
//! snapshot is for display only and orders are always priced from the live
//! catalog. Adding to a cart reserves nothing.

use serde::{Deserialize, Serialize};

use crate::order::OrderLine;
use crate::types::{Money, ProductId};

/// A product as seen at the moment it is added to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Money,
    pub image_url: Option<String>,
    pub quantity: i32,
}

impl CartLine {
    /// `price * quantity`, or `None` on overflow.
    #[must_use]
    pub fn subtotal(&self) -> Option<Money> {
        u32::try_from(self.quantity)
            .ok()
            .and_then(|quantity| self.price.times(quantity))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error(
        "insufficient stock for product {product_id}. Available: {available}, Requested: {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    #[error("cart total is too large")]
    TotalOverflow,
}

/// Check an add request against the product's current stock.
///
/// # Errors
///
/// [`CartError::InvalidQuantity`] for a non-positive quantity and
/// [`CartError::InsufficientStock`] when stock is below the requested amount.
pub const fn check_add(product: &CartProduct, quantity: i32) -> Result<(), CartError> {
    if quantity <= 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    if product.stock_quantity < quantity {
        return Err(CartError::InsufficientStock {
            product_id: product.id,
            available: product.stock_quantity,
            requested: quantity,
        });
    }
    Ok(())
}

/// Quantity of a line after adding `quantity` to an `existing` one.
///
/// Each add is checked on its own, so repeated adds are capped at the
/// product's current stock instead of growing without bound.
#[must_use]
pub fn merged_quantity(existing: i32, quantity: i32, stock_quantity: i32) -> i32 {
    existing.saturating_add(quantity).min(stock_quantity.max(quantity))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Rebuild a cart from stored lines, dropping any with a non-positive quantity.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self {
            lines: lines.into_iter().filter(|line| line.quantity > 0).collect(),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Add `quantity` of `product`, merging into an existing line up to the
    /// product's stock.
    ///
    /// # Errors
    ///
    /// See [`check_add`].
    pub fn add(&mut self, product: &CartProduct, quantity: i32) -> Result<(), CartError> {
        check_add(product, quantity)?;
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.quantity = merged_quantity(line.quantity, quantity, product.stock_quantity);
        } else {
            self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                image_url: product.image_url.clone(),
                quantity,
            });
        }
        Ok(())
    }

    /// Remove a product's line. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        self.lines.len() != before
    }

    /// Change a line's quantity by `delta`; a result of zero or less removes it.
    ///
    /// Returns the new quantity, or `None` if the line is gone (or never existed).
    pub fn adjust(&mut self, product_id: ProductId, delta: i32) -> Option<i32> {
        let position = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)?;
        let line = self.lines.get_mut(position)?;
        let next = line.quantity.saturating_add(delta);
        if next <= 0 {
            self.lines.remove(position);
            None
        } else {
            line.quantity = next;
            Some(next)
        }
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.quantity)).sum()
    }

    /// Sum of `price * quantity` across lines.
    ///
    /// # Errors
    ///
    /// [`CartError::TotalOverflow`] if the amount does not fit.
    pub fn total_amount(&self) -> Result<Money, CartError> {
        self.lines.iter().try_fold(Money::ZERO, |acc, line| {
            line.subtotal()
                .and_then(|subtotal| acc.checked_add(subtotal))
                .ok_or(CartError::TotalOverflow)
        })
    }

    /// The cart as order lines, for checkout.
    #[must_use]
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.lines
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect()
    }
}
