//! QKart backend API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for the catalog and the cart; the
//!   client never patches the cart locally
//! - Each concern is a trait ([`CatalogApi`], [`CartApi`], [`AuthApi`],
//!   [`AddressApi`]) so components depend only on what they call and tests
//!   can swap in an in-memory backend
//! - [`HttpBackend`] implements all of them over `reqwest`, caching catalog
//!   and search responses with `moka`
//!
//! # Endpoints
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/products` | - |
//! | GET | `/products/search?value=<text>` | - |
//! | GET | `/cart` | bearer |
//! | POST | `/cart` `{productId, qty}` | bearer |
//! | POST | `/cart/checkout` `{addressId}` | bearer |
//! | POST | `/auth/register` `{username, password}` | - |
//! | POST | `/auth/login` `{username, password}` | - |
//! | GET/POST | `/user/addresses` | bearer |
//! | DELETE | `/user/addresses/{id}` | bearer |

mod cache;
mod http;

use std::fmt;
use std::future::Future;

use qkart_core::{
    Address, AddressId, AddressText, LoginForm, Price, Product, ProductId, Registration,
    SparseCart,
};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub use http::HttpBackend;

/// Errors that can occur when talking to the QKart backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, TLS...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error: {status} - {}", message.as_deref().unwrap_or("(no message)"))]
    Status {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, when present.
        message: Option<String>,
    },

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configured endpoint cannot be extended with a path.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    /// HTTP status code, if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message supplied by the backend, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Successful login response.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Username the backend logged in.
    pub username: String,
    /// Wallet balance.
    pub balance: Price,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .field("username", &self.username)
            .field("balance", &self.balance)
            .finish()
    }
}

/// Product listing and search.
pub trait CatalogApi: Send + Sync {
    /// Fetch every product (`GET /products`).
    fn products(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Search products by name or category (`GET /products/search`).
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;
}

/// The user's cart.
pub trait CartApi: Send + Sync {
    /// Fetch the sparse cart (`GET /cart`).
    fn fetch_cart(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<SparseCart, ApiError>> + Send;

    /// Set the quantity of a product (`POST /cart`), returning the whole
    /// updated cart. A quantity of zero removes the product.
    fn upsert_cart(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<SparseCart, ApiError>> + Send;

    /// Place an order for the whole cart (`POST /cart/checkout`).
    fn checkout(
        &self,
        token: &SecretString,
        address_id: &AddressId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Account registration and login.
pub trait AuthApi: Send + Sync {
    /// Create an account (`POST /auth/register`).
    fn register(&self, form: &Registration) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Log in (`POST /auth/login`).
    fn login(&self, form: &LoginForm) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;
}

/// Saved delivery addresses.
pub trait AddressApi: Send + Sync {
    /// List addresses (`GET /user/addresses`).
    fn addresses(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Vec<Address>, ApiError>> + Send;

    /// Save a new address, returning the full list.
    fn add_address(
        &self,
        token: &SecretString,
        address: &AddressText,
    ) -> impl Future<Output = Result<Vec<Address>, ApiError>> + Send;

    /// Delete an address, returning the remaining list.
    fn delete_address(
        &self,
        token: &SecretString,
        address_id: &AddressId,
    ) -> impl Future<Output = Result<Vec<Address>, ApiError>> + Send;
}
