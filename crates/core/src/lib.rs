//! QKart Core - Shared domain types.
//!
//! This crate provides the types shared by every QKart component:
//! - `client` - Storefront client core (catalog, cart, search, checkout)
//! - `cli` - Command-line view layer over the client
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no async runtime. This keeps it lightweight and allows it to be
//! used anywhere, including the test backend fixture.
//!
//! # Modules
//!
//! - [`types`] - Product and cart types, type-safe IDs, prices and form input

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
