//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. Request inputs that map one-to-one onto a repository call
//! live here too.

pub mod account;
pub mod catalog;
pub mod order;

pub use account::{AdminUser, NewUserAccount, ProfileFields, ProfileUpdate, UserAccount};
pub use catalog::{
    Category, CategoryInput, NewProduct, Product, ProductFilter, ProductUpdate,
};
pub use order::{AdminOrderView, Order, OrderItem, OrderItemDetail, OrderWithItems, PlacedOrder};
