//! Cart mutations against the backend.
//!
//! # Decision table
//!
//! | in cart | `prevent_duplicate` | action |
//! |---|---|---|
//! | no | any | upsert `(product, quantity)` |
//! | yes | `true` | upsert (quantity update) |
//! | yes | `false` | [`ClientError::DuplicateItem`], no request |
//!
//! A quantity of zero or less is a removal: it is sent as `qty = 0`, which
//! the backend treats as "delete the entry". Removing a product that is not
//! in the cart returns the cart unchanged without a request.
//!
//! Only one mutation is in flight per coordinator. A request that arrives
//! while another is pending fails with [`ClientError::Busy`] before touching
//! the network.

use qkart_core::{ProductId, SparseCart};
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tracing::{debug, instrument, warn};

use crate::api::CartApi;
use crate::error::ClientError;
use crate::session::Session;

/// How a quantity change treats a product that is already in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationOptions {
    /// `true` lets the request update an existing entry; `false` rejects it
    /// with [`ClientError::DuplicateItem`].
    pub prevent_duplicate: bool,
}

impl MutationOptions {
    /// "Add to cart" from a product listing: rejects products already in the
    /// cart.
    #[must_use]
    pub const fn add() -> Self {
        Self {
            prevent_duplicate: false,
        }
    }

    /// Quantity controls in the cart: updates existing entries.
    #[must_use]
    pub const fn update() -> Self {
        Self {
            prevent_duplicate: true,
        }
    }
}

/// Progress of the most recent mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
    /// Nothing has been requested yet.
    #[default]
    Idle,
    /// A request is in flight.
    Pending {
        /// Product being changed.
        product_id: ProductId,
        /// Quantity sent to the backend.
        quantity: u32,
    },
    /// The backend accepted the change.
    Applied {
        /// Product that was changed.
        product_id: ProductId,
        /// Quantity sent to the backend.
        quantity: u32,
    },
    /// The request failed.
    Rejected {
        /// Product that was being changed.
        product_id: ProductId,
        /// Message shown to the user.
        reason: String,
    },
}

impl MutationState {
    /// Whether a request is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Serializes cart mutations and applies the duplicate rule.
pub struct CartMutationCoordinator<A> {
    api: A,
    in_flight: Mutex<()>,
    state: watch::Sender<MutationState>,
}

impl<A: CartApi> CartMutationCoordinator<A> {
    /// Create a coordinator issuing requests through `api`.
    #[must_use]
    pub fn new(api: A) -> Self {
        let (state, _) = watch::channel(MutationState::Idle);
        Self {
            api,
            in_flight: Mutex::new(()),
            state,
        }
    }

    /// State of the most recent mutation.
    #[must_use]
    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    /// Watch mutation progress (e.g. to drive a busy indicator).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }

    /// Set the quantity of `product_id` given the caller's view of the cart.
    ///
    /// Returns the cart the backend answered with. Nothing local is changed;
    /// see [`Self::apply`] for the session-bound form.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Unauthenticated`] without a credential
    /// - [`ClientError::DuplicateItem`] per the decision table
    /// - [`ClientError::InvalidQuantity`] above `u32::MAX`
    /// - [`ClientError::Busy`] while another mutation is pending
    /// - [`ClientError::ProductNotFound`] or [`ClientError::MutationFailed`]
    ///   when the request fails
    #[instrument(
        skip(self, credential, current, product_id, options),
        fields(product_id = %product_id)
    )]
    pub async fn set_quantity(
        &self,
        credential: Option<&SecretString>,
        current: &SparseCart,
        product_id: &ProductId,
        new_quantity: i64,
        options: MutationOptions,
    ) -> Result<SparseCart, ClientError> {
        let token = credential.ok_or(ClientError::Unauthenticated)?;

        let already_in_cart = current.contains(product_id);
        if already_in_cart && !options.prevent_duplicate {
            debug!("product already in cart");
            return Err(ClientError::DuplicateItem);
        }

        let quantity = if new_quantity <= 0 {
            if !already_in_cart {
                debug!("removal of a product not in the cart");
                return Ok(current.clone());
            }
            0
        } else {
            u32::try_from(new_quantity).map_err(|_| ClientError::InvalidQuantity(new_quantity))?
        };

        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("dropping overlapping cart mutation");
            return Err(ClientError::Busy);
        };

        self.state.send_replace(MutationState::Pending {
            product_id: product_id.clone(),
            quantity,
        });

        match self.api.upsert_cart(token, product_id, quantity).await {
            Ok(cart) => {
                self.state.send_replace(MutationState::Applied {
                    product_id: product_id.clone(),
                    quantity,
                });
                Ok(cart)
            }
            Err(e) => {
                let err = ClientError::from_mutation(&e);
                warn!(error = %e, "cart mutation failed");
                self.state.send_replace(MutationState::Rejected {
                    product_id: product_id.clone(),
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Set a quantity against the session's cart and commit the result.
    ///
    /// The backend's cart is stored only if the session cart has not been
    /// replaced while the request was in flight.
    ///
    /// # Errors
    ///
    /// As [`Self::set_quantity`], plus [`ClientError::StaleCart`] when the
    /// session cart changed in the meantime (the newer cart is kept).
    pub async fn apply(
        &self,
        session: &Session,
        product_id: &ProductId,
        new_quantity: i64,
        options: MutationOptions,
    ) -> Result<SparseCart, ClientError> {
        let snapshot = session.cart();
        let credential = session.credential();

        let cart = self
            .set_quantity(
                credential.as_ref(),
                &snapshot.cart,
                product_id,
                new_quantity,
                options,
            )
            .await?;

        session.commit_cart(snapshot.generation, cart.clone())?;
        Ok(cart)
    }

    /// Add one unit of a product already in the session's cart (or add it).
    ///
    /// # Errors
    ///
    /// As [`Self::apply`].
    pub async fn increment(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<SparseCart, ClientError> {
        let current = session.cart().cart.quantity_of(product_id).unwrap_or(0);
        self.apply(
            session,
            product_id,
            i64::from(current) + 1,
            MutationOptions::update(),
        )
        .await
    }

    /// Remove one unit; the entry is deleted when its quantity reaches zero.
    ///
    /// # Errors
    ///
    /// As [`Self::apply`].
    pub async fn decrement(
        &self,
        session: &Session,
        product_id: &ProductId,
    ) -> Result<SparseCart, ClientError> {
        let current = session.cart().cart.quantity_of(product_id).unwrap_or(0);
        self.apply(
            session,
            product_id,
            i64::from(current) - 1,
            MutationOptions::update(),
        )
        .await
    }
}
