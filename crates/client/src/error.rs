//! Unified client error type.
//!
//! Every operation a view layer can trigger returns `Result<T, ClientError>`.
//! None of these are fatal: the view shows the message as a transient
//! notification and the user re-triggers the action. Nothing is retried.

use qkart_core::{AddressError, CredentialError, Price};
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Shown when the backend could not be reached or answered without a message.
pub const CONNECTIVITY_MESSAGE: &str =
    "Something went wrong. Check that the backend is running, reachable and returns valid JSON.";

/// Shown when the cart could not be fetched.
pub const CART_FETCH_MESSAGE: &str =
    "Could not fetch cart details. Check that the backend is running, reachable and returns valid JSON.";

/// Application-level error type for the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No credential in the session; the caller should prompt for login.
    #[error("Login to add an item to the Cart.")]
    Unauthenticated,

    /// Product is already in the cart and the request did not allow updates.
    #[error("Item already in cart. Use the cart sidebar to update quantity or remove item.")]
    DuplicateItem,

    /// The backend does not know the product (404 from the cart upsert).
    #[error("Product doesn't exist")]
    ProductNotFound,

    /// A cart mutation failed on the network or the server.
    #[error("{0}")]
    MutationFailed(String),

    /// A read (catalog, cart, addresses) failed; show the empty state.
    #[error("{0}")]
    FetchFailed(String),

    /// The backend rejected a request with a message (e.g. wrong password).
    #[error("{0}")]
    Rejected(String),

    /// Another cart mutation is still in flight.
    #[error("A cart update is already in progress. Please wait.")]
    Busy,

    /// The cart changed while the mutation was in flight; the result was discarded.
    #[error("Cart changed while updating. Refresh the cart and try again.")]
    StaleCart,

    /// Requested quantity cannot be represented.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Checkout with nothing in the cart.
    #[error("Cart is empty. Add more items to the cart to checkout.")]
    EmptyCart,

    /// Wallet balance does not cover the order.
    #[error("You do not have enough balance in your wallet for this purchase (total {total}, balance {balance})")]
    InsufficientBalance {
        /// Order total.
        total: Price,
        /// Wallet balance.
        balance: Price,
    },

    /// Login or registration input failed validation.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// Address input failed validation.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Local state could not be read or written.
    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Map a failed cart mutation.
    ///
    /// 404 means the product does not exist; anything else carries the
    /// backend's message, or a generic connectivity message.
    #[must_use]
    pub fn from_mutation(err: &ApiError) -> Self {
        if err.status() == Some(404) {
            return Self::ProductNotFound;
        }
        Self::MutationFailed(message_or(err, CONNECTIVITY_MESSAGE))
    }

    /// Map a failed cart fetch. 401 means the credential is missing or
    /// expired.
    #[must_use]
    pub fn from_cart_fetch(err: &ApiError) -> Self {
        if err.status() == Some(401) {
            return Self::Unauthenticated;
        }
        Self::FetchFailed(message_or(err, CART_FETCH_MESSAGE))
    }

    /// Map a failed read.
    #[must_use]
    pub fn from_fetch(err: &ApiError) -> Self {
        Self::FetchFailed(message_or(err, CONNECTIVITY_MESSAGE))
    }

    /// Map a failed request whose server message should be shown as-is
    /// (login, registration, addresses, checkout).
    #[must_use]
    pub fn from_rejection(err: &ApiError) -> Self {
        if err.status() == Some(401) {
            return Self::Unauthenticated;
        }
        Self::Rejected(message_or(err, CONNECTIVITY_MESSAGE))
    }
}

fn message_or(err: &ApiError, fallback: &str) -> String {
    err.server_message().unwrap_or(fallback).to_string()
}
