//! HTTP request handlers.

pub mod admin;
pub mod auth;
pub mod common;
pub mod datasets;
pub mod health;

pub use admin::*;
pub use auth::*;
pub use datasets::*;
pub use health::*;
