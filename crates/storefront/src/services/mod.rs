//! Business logic services for the storefront.
//!
//! - `auth` - account registration, login and token resolution
//! - `token` - signed bearer tokens

pub mod auth;
pub mod token;
