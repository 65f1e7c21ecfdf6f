//! Configuration module for icon2x
//!
//! Provides types, discovery and parsing for `icon2x.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
