//! Middleware Module
//!
//! This module contains request processing that runs before handlers.
//!
//! # Architecture
//!
//! The middleware module currently provides:
//!
//! - **`principal`** - `Principal` extractor for the forwarded user id
//!
//! # Example
//!
//! ```rust,no_run
//! use classboard::backend::middleware::Principal;
//!
//! async fn handler(principal: Principal) -> String {
//!     principal.user_id().to_string()
//! }
//! ```

pub mod principal;

pub use principal::{Principal, PRINCIPAL_HEADER};
