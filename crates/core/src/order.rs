//! Order planning.
//!
//! [`plan_order`] is the decision half of order placement: given the requested
//! lines and the current state of the products they name, it either produces
//! the exact rows to write (items with snapshotted prices, the total, and the
//! per-product stock decrements) or the first reason the order cannot be
//! placed. The storefront runs it inside the transaction that holds the
//! product row locks and then applies the plan.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Money, ProductId};

/// One requested line: a product and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// The product fields planning needs, read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i32,
}

/// A line ready to be written as an order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
}

/// Everything needed to commit an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    /// Items in submission order.
    pub items: Vec<PlannedItem>,
    /// Sum of `quantity * unit_price` over `items`.
    pub total: Money,
    /// Total quantity to take from each product, sorted by product id.
    pub stock_decrements: Vec<(ProductId, i32)>,
}

/// Why an order cannot be placed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order must contain at least one item")]
    Empty,

    #[error("quantity for product {product_id} must be positive, got {quantity}")]
    InvalidQuantity { product_id: ProductId, quantity: i32 },

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error(
        "insufficient stock for product {product_id}. Available: {available}, Requested: {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    #[error("order total is too large")]
    TotalOverflow,
}

/// Reject lines that can be refused without looking at any product.
///
/// # Errors
///
/// [`OrderError::Empty`] for no lines, [`OrderError::InvalidQuantity`] for the
/// first line whose quantity is zero or negative.
pub fn validate_lines(lines: &[OrderLine]) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::Empty);
    }
    if let Some(bad) = lines.iter().find(|line| line.quantity <= 0) {
        return Err(OrderError::InvalidQuantity {
            product_id: bad.product_id,
            quantity: bad.quantity,
        });
    }
    Ok(())
}

/// Distinct product ids named by `lines`, ascending.
///
/// Locking rows in this order keeps concurrent placements from deadlocking.
#[must_use]
pub fn lock_order(lines: &[OrderLine]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Check every line against current stock and price the order.
///
/// Lines are checked in submission order and the first failure wins. Several
/// lines naming the same product draw on the same stock.
///
/// # Errors
///
/// Any [`OrderError`]; no partial plan is ever returned.
pub fn plan_order(
    lines: &[OrderLine],
    products: &[ProductSnapshot],
) -> Result<OrderPlan, OrderError> {
    validate_lines(lines)?;

    let by_id: HashMap<ProductId, &ProductSnapshot> =
        products.iter().map(|product| (product.id, product)).collect();
    let mut taken: HashMap<ProductId, i32> = HashMap::new();
    let mut items = Vec::with_capacity(lines.len());
    let mut total = Money::ZERO;

    for line in lines {
        let product = by_id
            .get(&line.product_id)
            .ok_or(OrderError::ProductNotFound(line.product_id))?;

        let already = taken.get(&line.product_id).copied().unwrap_or(0);
        let available = product.stock_quantity.saturating_sub(already).max(0);
        if available < line.quantity {
            return Err(OrderError::InsufficientStock {
                product_id: line.product_id,
                available,
                requested: line.quantity,
            });
        }

        let quantity = u32::try_from(line.quantity).map_err(|_| OrderError::InvalidQuantity {
            product_id: line.product_id,
            quantity: line.quantity,
        })?;
        let line_total = product
            .price
            .times(quantity)
            .ok_or(OrderError::TotalOverflow)?;
        total = total
            .checked_add(line_total)
            .ok_or(OrderError::TotalOverflow)?;

        taken.insert(line.product_id, already + line.quantity);
        items.push(PlannedItem {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    let mut stock_decrements: Vec<(ProductId, i32)> = taken.into_iter().collect();
    stock_decrements.sort_unstable_by_key(|(id, _)| *id);

    Ok(OrderPlan {
        items,
        total,
        stock_decrements,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(id: i32, price: &str, stock: i32) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: price.parse().unwrap(),
            stock_quantity: stock,
        }
    }

    fn line(id: i32, quantity: i32) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_empty_order_rejected() {
        assert_eq!(plan_order(&[], &[product(1, "1.00", 5)]), Err(OrderError::Empty));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let products = [product(1, "1.00", 5)];
        assert!(matches!(
            plan_order(&[line(1, 0)], &products),
            Err(OrderError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(matches!(
            plan_order(&[line(1, -2)], &products),
            Err(OrderError::InvalidQuantity { quantity: -2, .. })
        ));
    }

    #[test]
    fn test_plan_prices_and_totals() {
        let products = [product(1, "10.00", 5), product(2, "2.50", 100)];
        let plan = plan_order(&[line(1, 3), line(2, 4)], &products).unwrap();

        assert_eq!(plan.total.to_string(), "40.00");
        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].unit_price.to_string(), "10.00");
        assert_eq!(plan.items[1].quantity, 4);
        assert_eq!(
            plan.stock_decrements,
            vec![(ProductId::new(1), 3), (ProductId::new(2), 4)]
        );
    }

    #[test]
    fn test_total_equals_sum_of_items() {
        let products = [product(1, "19.99", 50), product(2, "0.01", 50)];
        let plan = plan_order(&[line(2, 7), line(1, 3)], &products).unwrap();
        let sum: Money = plan
            .items
            .iter()
            .map(|item| item.unit_price.times(item.quantity.unsigned_abs()).unwrap())
            .sum();
        assert_eq!(plan.total, sum);
    }

    #[test]
    fn test_exact_stock_is_enough() {
        let plan = plan_order(&[line(1, 5)], &[product(1, "1.00", 5)]).unwrap();
        assert_eq!(plan.stock_decrements, vec![(ProductId::new(1), 5)]);
    }

    #[test]
    fn test_insufficient_stock_reports_available_and_requested() {
        let err = plan_order(&[line(1, 3)], &[product(1, "1.00", 2)]).unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: ProductId::new(1),
                available: 2,
                requested: 3,
            }
        );
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 1. Available: 2, Requested: 3"
        );
    }

    #[test]
    fn test_missing_product_rejected() {
        let err = plan_order(&[line(1, 1), line(99, 1)], &[product(1, "1.00", 5)]).unwrap_err();
        assert_eq!(err, OrderError::ProductNotFound(ProductId::new(99)));
    }

    #[test]
    fn test_first_failing_line_wins() {
        let products = [product(1, "1.00", 0)];
        let err = plan_order(&[line(1, 1), line(42, 1)], &products).unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { .. }));
    }

    #[test]
    fn test_repeated_product_lines_share_stock() {
        let products = [product(1, "3.00", 5)];
        let ok = plan_order(&[line(1, 2), line(1, 3)], &products).unwrap();
        assert_eq!(ok.items.len(), 2);
        assert_eq!(ok.stock_decrements, vec![(ProductId::new(1), 5)]);
        assert_eq!(ok.total.to_string(), "15.00");

        let err = plan_order(&[line(1, 3), line(1, 3)], &products).unwrap_err();
        assert_eq!(
            err,
            OrderError::InsufficientStock {
                product_id: ProductId::new(1),
                available: 2,
                requested: 3,
            }
        );
    }

    #[test]
    fn test_lock_order_sorted_and_distinct() {
        let ids = lock_order(&[line(5, 1), line(2, 1), line(5, 2), line(3, 1)]);
        assert_eq!(
            ids,
            vec![ProductId::new(2), ProductId::new(3), ProductId::new(5)]
        );
    }

    #[test]
    fn test_validate_lines_before_lookup() {
        assert_eq!(validate_lines(&[]), Err(OrderError::Empty));
        assert!(validate_lines(&[line(1, 1)]).is_ok());
    }

    #[test]
    fn test_total_above_column_limit_rejected() {
        let products = [product(1, "99999999.99", i32::MAX)];
        assert_eq!(
            plan_order(&[line(1, 2)], &products),
            Err(OrderError::TotalOverflow)
        );

        let products = [product(1, "1000.00", 200_000)];
        assert_eq!(
            plan_order(&[line(1, 200_000)], &products),
            Err(OrderError::TotalOverflow)
        );

        let products = [product(1, "60000000.00", 5), product(2, "50000000.00", 5)];
        assert_eq!(
            plan_order(&[line(1, 1), line(2, 1)], &products),
            Err(OrderError::TotalOverflow)
        );
        assert_eq!(
            plan_order(&[line(1, 1)], &products).unwrap().total,
            "60000000.00".parse().unwrap()
        );
    }
}
