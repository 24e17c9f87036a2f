//! Core types for QKart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod cart;
pub mod credentials;
pub mod id;
pub mod price;
pub mod product;

pub use address::{Address, AddressError, AddressText};
pub use cart::{CartEntry, CartTotals, LineItem, SparseCart};
pub use credentials::{CredentialError, LoginForm, Password, Registration, Username};
pub use id::*;
pub use price::{Price, PriceError};
pub use product::{Product, Rating, RatingError};
