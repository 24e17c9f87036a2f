//! Storefront facade.
//!
//! [`Storefront`] is what a view layer holds. It owns the catalog, the
//! session, the mutation coordinator and the search debouncer, and keeps a
//! priced [`CartView`] that is recomputed whenever the catalog or the cart
//! changes. Views either call [`Storefront::cart_view`] or subscribe to
//! changes with [`Storefront::subscribe_cart`].

use std::sync::{Arc, PoisonError, RwLock};

use qkart_core::{
    Address, AddressId, AddressText, LoginForm, Price, Product, ProductId, Registration,
    SparseCart,
};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::api::{AddressApi, AuthApi, CartApi, CatalogApi};
use crate::cart::{CartMutationCoordinator, CartView, MutationOptions, MutationState};
use crate::checkout::{self, OrderSummary};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::search::{SearchDebouncer, SearchResults};
use crate::session::Session;
use crate::storage::KeyValueStore;

/// Everything the storefront needs from the backend.
pub trait Backend: CatalogApi + CartApi + AuthApi + AddressApi + Clone + 'static {}

impl<T> Backend for T where T: CatalogApi + CartApi + AuthApi + AddressApi + Clone + 'static {}

/// Client-side storefront state.
///
/// Cheaply cloneable; clones share all state.
pub struct Storefront<A> {
    inner: Arc<StorefrontInner<A>>,
}

impl<A> Clone for Storefront<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StorefrontInner<A> {
    config: ClientConfig,
    api: A,
    session: Session,
    coordinator: CartMutationCoordinator<A>,
    search: SearchDebouncer<A>,
    catalog: RwLock<Arc<Vec<Product>>>,
    cart_view: watch::Sender<CartView>,
}

impl<A: Backend> Storefront<A> {
    /// Create a storefront, restoring any session persisted in `store`.
    ///
    /// The catalog starts empty; call [`Self::load_catalog`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn new(
        config: ClientConfig,
        api: A,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ClientError> {
        let session = Session::restore(store)?;
        let (cart_view, _) = watch::channel(CartView::default());

        let storefront = Self {
            inner: Arc::new(StorefrontInner {
                coordinator: CartMutationCoordinator::new(api.clone()),
                search: SearchDebouncer::new(api.clone(), config.search_debounce),
                config,
                api,
                session,
                catalog: RwLock::new(Arc::new(Vec::new())),
                cart_view,
            }),
        };
        storefront.recompute();
        Ok(storefront)
    }

    /// Configuration the storefront was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    fn credential(&self) -> Result<SecretString, ClientError> {
        self.inner
            .session
            .credential()
            .ok_or(ClientError::Unauthenticated)
    }

    /// Re-merge the cached cart with the catalog and publish the result.
    fn recompute(&self) -> CartView {
        let cart = self.inner.session.cart().cart;
        let view = CartView::build(&cart, &self.catalog());
        self.inner.cart_view.send_replace(view.clone());
        view
    }

    fn set_catalog(&self, products: Vec<Product>) {
        *self
            .inner
            .catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(products);
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the full catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::FetchFailed`] if the request fails; the catalog
    /// is then empty.
    #[instrument(skip(self))]
    pub async fn load_catalog(&self) -> Result<Arc<Vec<Product>>, ClientError> {
        let result = self.inner.api.products().await;
        let products = match result {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "failed to load catalog");
                self.set_catalog(Vec::new());
                self.recompute();
                return Err(ClientError::from_fetch(&e));
            }
        };

        info!(count = products.len(), "loaded catalog");
        self.set_catalog(products);
        self.recompute();
        Ok(self.catalog())
    }

    /// Currently loaded catalog.
    #[must_use]
    pub fn catalog(&self) -> Arc<Vec<Product>> {
        Arc::clone(
            &self
                .inner
                .catalog
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Search immediately. A blank query lists the whole catalog; failures
    /// give an empty list.
    pub async fn search_now(&self, text: &str) -> Vec<Product> {
        self.inner.search.search_now(text).await
    }

    /// Feed search box input through the debouncer.
    pub fn on_search_input(&self, text: &str) {
        self.inner.search.on_input(text);
    }

    /// Watch debounced search results.
    #[must_use]
    pub fn subscribe_search(&self) -> watch::Receiver<SearchResults> {
        self.inner.search.subscribe()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns a validation error, or the backend's message (e.g. "Username
    /// is already taken").
    #[instrument(skip(self, password, confirm))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<(), ClientError> {
        let form = Registration::new(username, password, confirm)?;
        self.inner
            .api
            .register(&form)
            .await
            .map_err(|e| ClientError::from_rejection(&e))?;
        info!("registered");
        Ok(())
    }

    /// Log in and load the user's cart.
    ///
    /// A cart that fails to load is logged and left empty; the login itself
    /// still succeeds.
    ///
    /// # Errors
    ///
    /// Returns a validation error, the backend's message (e.g. "Password is
    /// incorrect"), or a storage error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let form = LoginForm::new(username, password)?;
        let response = self
            .inner
            .api
            .login(&form)
            .await
            .map_err(|e| ClientError::from_rejection(&e))?;

        self.inner.session.login(response)?;
        self.recompute();

        if let Err(e) = self.refresh_cart().await {
            warn!(error = %e, "logged in but the cart could not be loaded");
        }
        Ok(())
    }

    /// Log out and clear local state.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage cannot be cleared.
    pub fn logout(&self) -> Result<(), ClientError> {
        let result = self.inner.session.logout();
        self.recompute();
        result.map_err(ClientError::from)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Replace the cached cart with the backend's.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Unauthenticated`] without a session, or when the
    ///   backend rejects the credential
    /// - [`ClientError::FetchFailed`] otherwise; the cart is then empty
    /// - [`ClientError::StaleCart`] if the cart changed during the request
    #[instrument(skip(self))]
    pub async fn refresh_cart(&self) -> Result<CartView, ClientError> {
        let token = self.credential()?;
        let generation = self.inner.session.cart().generation;

        match self.inner.api.fetch_cart(&token).await {
            Ok(cart) => {
                self.inner.session.commit_cart(generation, cart)?;
                Ok(self.recompute())
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch cart");
                self.inner.session.replace_cart(SparseCart::empty())?;
                self.recompute();
                Err(ClientError::from_cart_fetch(&e))
            }
        }
    }

    async fn mutate(
        &self,
        product_id: &ProductId,
        quantity: i64,
        options: MutationOptions,
    ) -> Result<CartView, ClientError> {
        let result = self
            .inner
            .coordinator
            .apply(&self.inner.session, product_id, quantity, options)
            .await;
        let view = self.recompute();
        result.map(|_| view)
    }

    /// "Add to cart" from a product listing.
    ///
    /// # Errors
    ///
    /// [`ClientError::DuplicateItem`] if the product is already in the cart,
    /// plus everything [`CartMutationCoordinator::apply`] returns.
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartView, ClientError> {
        self.mutate(product_id, i64::from(quantity), MutationOptions::add())
            .await
    }

    /// Set the quantity of a product; zero or less removes it.
    ///
    /// # Errors
    ///
    /// As [`CartMutationCoordinator::apply`].
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartView, ClientError> {
        self.mutate(product_id, quantity, MutationOptions::update())
            .await
    }

    /// Add one unit.
    ///
    /// # Errors
    ///
    /// As [`CartMutationCoordinator::increment`].
    pub async fn increment(&self, product_id: &ProductId) -> Result<CartView, ClientError> {
        let result = self
            .inner
            .coordinator
            .increment(&self.inner.session, product_id)
            .await;
        let view = self.recompute();
        result.map(|_| view)
    }

    /// Remove one unit.
    ///
    /// # Errors
    ///
    /// As [`CartMutationCoordinator::decrement`].
    pub async fn decrement(&self, product_id: &ProductId) -> Result<CartView, ClientError> {
        let result = self
            .inner
            .coordinator
            .decrement(&self.inner.session, product_id)
            .await;
        let view = self.recompute();
        result.map(|_| view)
    }

    /// Priced cart contents.
    #[must_use]
    pub fn cart_view(&self) -> CartView {
        self.inner.cart_view.borrow().clone()
    }

    /// Watch the priced cart.
    #[must_use]
    pub fn subscribe_cart(&self) -> watch::Receiver<CartView> {
        self.inner.cart_view.subscribe()
    }

    /// Watch cart mutation progress.
    #[must_use]
    pub fn subscribe_mutations(&self) -> watch::Receiver<MutationState> {
        self.inner.coordinator.subscribe()
    }

    /// Summary of the current cart.
    #[must_use]
    pub fn order_summary(&self) -> OrderSummary {
        OrderSummary::of(&self.cart_view())
    }

    // =========================================================================
    // Addresses & checkout
    // =========================================================================

    /// Saved delivery addresses.
    ///
    /// # Errors
    ///
    /// [`ClientError::Unauthenticated`] without a session, or the backend's
    /// message.
    #[instrument(skip(self))]
    pub async fn addresses(&self) -> Result<Vec<Address>, ClientError> {
        let token = self.credential()?;
        self.inner
            .api
            .addresses(&token)
            .await
            .map_err(|e| ClientError::from_rejection(&e))
    }

    /// Save a new address, returning the updated list.
    ///
    /// # Errors
    ///
    /// A validation error for empty or short text, otherwise as
    /// [`Self::addresses`].
    #[instrument(skip(self, text))]
    pub async fn add_address(&self, text: &str) -> Result<Vec<Address>, ClientError> {
        let token = self.credential()?;
        let address = AddressText::parse(text)?;
        self.inner
            .api
            .add_address(&token, &address)
            .await
            .map_err(|e| ClientError::from_rejection(&e))
    }

    /// Delete a saved address, returning the updated list.
    ///
    /// # Errors
    ///
    /// As [`Self::addresses`].
    #[instrument(skip(self, address_id), fields(address_id = %address_id))]
    pub async fn delete_address(&self, address_id: &AddressId) -> Result<Vec<Address>, ClientError> {
        let token = self.credential()?;
        self.inner
            .api
            .delete_address(&token, address_id)
            .await
            .map_err(|e| ClientError::from_rejection(&e))
    }

    /// Place an order for the whole cart, shipped to `address_id`.
    ///
    /// On success the cart is emptied and the order total is deducted from
    /// the stored wallet balance, which is returned.
    ///
    /// # Errors
    ///
    /// [`ClientError::Unauthenticated`], [`ClientError::EmptyCart`],
    /// [`ClientError::InsufficientBalance`], or the backend's message.
    #[instrument(skip(self, address_id), fields(address_id = %address_id))]
    pub async fn checkout(&self, address_id: &AddressId) -> Result<Price, ClientError> {
        let token = self.credential()?;
        let view = self.cart_view();
        let balance = self.inner.session.balance().unwrap_or(Price::ZERO);
        let remaining = checkout::validate(&view, balance)?;

        self.inner
            .api
            .checkout(&token, address_id)
            .await
            .map_err(|e| ClientError::from_rejection(&e))?;

        self.inner.session.set_balance(remaining)?;
        self.inner.session.replace_cart(SparseCart::empty())?;
        self.recompute();

        info!(total = %view.totals.total_value, balance = %remaining, "order placed");
        Ok(remaining)
    }
}
