//! Tech Store Core - Domain types and order rules.
//!
//! This crate provides the types and pure business rules shared by the
//! Tech Store components:
//! - `storefront` - JSON REST API for the catalog, accounts, carts and orders
//! - `cli` - Command-line tools for migrations, admin accounts and seeding
//!
//! # Architecture
//!
//! The core crate contains no I/O, no database access and no HTTP code.
//! Everything here is deterministic and unit-testable; the storefront wraps
//! these rules in transactions and handlers.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, statuses and roles
//! - [`identity`] - Resolved caller identity and the role predicate
//! - [`order`] - Order planning: stock checks and totals for a set of lines
//! - [`cart`] - In-memory cart arithmetic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod identity;
pub mod order;
pub mod types;

pub use cart::{Cart, CartError, CartLine, CartProduct, check_add, merged_quantity};
pub use identity::{AccountRef, Forbidden, Identity, authorize};
pub use order::{
    OrderError, OrderLine, OrderPlan, PlannedItem, ProductSnapshot, lock_order, plan_order,
    validate_lines,
};
pub use types::*;
