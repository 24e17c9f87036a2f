//! Authenticated session state.
//!
//! A [`Session`] owns the bearer credential, the user's identity and wallet
//! balance, and the cached sparse cart. It has an explicit lifecycle:
//!
//! - [`Session::restore`] reads whatever a previous run persisted
//! - [`Session::login`] replaces the identity and empties the cart cache
//! - [`Session::logout`] clears local storage and drops everything
//!
//! Everything is mirrored to a [`KeyValueStore`] so a restarted client comes
//! back logged in. Stored values that no longer parse are discarded with a
//! warning; the backend is authoritative and the next refresh repairs them.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use qkart_core::{Price, SparseCart};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::api::LoginResponse;
use crate::cart::{CartCache, CartSnapshot};
use crate::error::ClientError;
use crate::storage::{KeyValueStore, StorageError};

/// Keys used in the local store.
pub mod keys {
    /// Bearer token.
    pub const TOKEN: &str = "token";
    /// Logged-in username.
    pub const USERNAME: &str = "username";
    /// Wallet balance, as a decimal string.
    pub const BALANCE: &str = "balance";
    /// Cached sparse cart, as JSON.
    pub const CART: &str = "cart";
    /// RFC 3339 login timestamp.
    pub const LOGGED_IN_AT: &str = "loggedInAt";
}

/// Who is logged in.
#[derive(Clone)]
pub struct Identity {
    token: SecretString,
    /// Username reported by the backend at login.
    pub username: String,
    /// Wallet balance.
    pub balance: Price,
    /// When the login happened, if known.
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// The bearer credential.
    #[must_use]
    pub const fn token(&self) -> &SecretString {
        &self.token
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("token", &"[REDACTED]")
            .field("username", &self.username)
            .field("balance", &self.balance)
            .field("logged_in_at", &self.logged_in_at)
            .finish()
    }
}

/// Credential, identity and cart cache.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    identity: RwLock<Option<Identity>>,
    cart: CartCache,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &*self.read_identity())
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Rebuild a session from `store`.
    ///
    /// Without a stored token the session is logged out and the cart is
    /// empty, whatever else the store holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let Some(token) = store.get(keys::TOKEN)? else {
            return Ok(Self {
                store,
                identity: RwLock::new(None),
                cart: CartCache::default(),
            });
        };

        let username = store.get(keys::USERNAME)?.unwrap_or_default();
        let balance = store
            .get(keys::BALANCE)?
            .and_then(|raw| parse_balance(&raw))
            .unwrap_or(Price::ZERO);
        let logged_in_at = store
            .get(keys::LOGGED_IN_AT)?
            .and_then(|raw| parse_timestamp(&raw));
        let cart = store
            .get(keys::CART)?
            .and_then(|raw| parse_cart(&raw))
            .unwrap_or_default();

        info!(username = %username, items = cart.len(), "restored session");

        Ok(Self {
            store,
            identity: RwLock::new(Some(Identity {
                token: SecretString::from(token),
                username,
                balance,
                logged_in_at,
            })),
            cart: CartCache::new(cart),
        })
    }

    fn read_identity(&self) -> RwLockReadGuard<'_, Option<Identity>> {
        self.identity.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_identity(&self) -> RwLockWriteGuard<'_, Option<Identity>> {
        self.identity.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session from a successful login.
    ///
    /// Any previous identity is replaced and the cart cache is emptied; the
    /// caller is expected to refresh it from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written. The in-memory
    /// session is updated regardless.
    pub fn login(&self, response: LoginResponse) -> Result<(), StorageError> {
        let now = Utc::now();
        let LoginResponse {
            token,
            username,
            balance,
        } = response;

        *self.write_identity() = Some(Identity {
            token: SecretString::from(token.clone()),
            username: username.clone(),
            balance,
            logged_in_at: Some(now),
        });
        self.cart.reset(SparseCart::empty());

        info!(username = %username, "logged in");

        self.store.set(keys::TOKEN, &token)?;
        self.store.set(keys::USERNAME, &username)?;
        self.store
            .set(keys::BALANCE, &balance.amount().to_string())?;
        self.store.set(keys::LOGGED_IN_AT, &now.to_rfc3339())?;
        self.store.remove(keys::CART)
    }

    /// End the session and clear local storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be cleared. The in-memory
    /// session is cleared regardless.
    pub fn logout(&self) -> Result<(), StorageError> {
        if let Some(identity) = self.write_identity().take() {
            info!(username = %identity.username, "logged out");
        }
        self.cart.reset(SparseCart::empty());
        self.store.clear()
    }

    /// Whether a credential is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.read_identity().is_some()
    }

    /// The bearer credential, if logged in.
    #[must_use]
    pub fn credential(&self) -> Option<SecretString> {
        self.read_identity().as_ref().map(|i| i.token.clone())
    }

    /// The current identity, if logged in.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.read_identity().clone()
    }

    /// Logged-in username.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.read_identity().as_ref().map(|i| i.username.clone())
    }

    /// Wallet balance.
    #[must_use]
    pub fn balance(&self) -> Option<Price> {
        self.read_identity().as_ref().map(|i| i.balance)
    }

    /// Update the wallet balance. Ignored when logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set_balance(&self, balance: Price) -> Result<(), StorageError> {
        {
            let mut guard = self.write_identity();
            let Some(identity) = guard.as_mut() else {
                return Ok(());
            };
            identity.balance = balance;
        }
        self.store
            .set(keys::BALANCE, &balance.amount().to_string())
    }

    /// The cached cart and its generation.
    #[must_use]
    pub fn cart(&self) -> CartSnapshot {
        self.cart.snapshot()
    }

    /// Store `cart` if the cache is still at `expected_generation`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::StaleCart`] if another write happened since
    /// `expected_generation` was read, or a storage error if persisting
    /// fails.
    pub fn commit_cart(
        &self,
        expected_generation: u64,
        cart: SparseCart,
    ) -> Result<u64, ClientError> {
        let json = serialize_cart(&cart)?;
        let generation = self
            .cart
            .replace_if_current(expected_generation, cart)
            .map_err(|current| {
                warn!(
                    expected = expected_generation,
                    current, "discarding cart update for a superseded cart"
                );
                ClientError::StaleCart
            })?;
        self.store.set(keys::CART, &json)?;
        Ok(generation)
    }

    /// Store `cart` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn replace_cart(&self, cart: SparseCart) -> Result<u64, ClientError> {
        let json = serialize_cart(&cart)?;
        let generation = self.cart.reset(cart);
        self.store.set(keys::CART, &json)?;
        Ok(generation)
    }
}

fn serialize_cart(cart: &SparseCart) -> Result<String, ClientError> {
    serde_json::to_string(cart)
        .map_err(|e| ClientError::MutationFailed(format!("Could not serialize cart: {e}")))
}

fn parse_balance(raw: &str) -> Option<Price> {
    raw.parse::<Decimal>()
        .ok()
        .and_then(|d| Price::new(d).ok())
        .or_else(|| {
            warn!(value = raw, "discarding unreadable stored balance");
            None
        })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .inspect_err(|e| warn!(error = %e, "discarding unreadable login timestamp"))
        .ok()
}

fn parse_cart(raw: &str) -> Option<SparseCart> {
    serde_json::from_str(raw)
        .inspect_err(|e| warn!(error = %e, "discarding unreadable cached cart"))
        .ok()
}
