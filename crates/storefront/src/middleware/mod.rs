//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with method, uri, request id)
//! 3. Request ID (propagate or generate `x-request-id`)
//! 4. Security headers
//! 5. CORS
//! 6. Rate limiting on credential routes (governor)
//!
//! Authentication is not a layer: handlers opt in through the extractors in
//! [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{RequireAuth, RequireCustomer, RequireStaff};
pub use rate_limit::{auth_rate_limiter, rate_limit_response};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
