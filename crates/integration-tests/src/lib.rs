//! End-to-end test support for the QKart client.
//!
//! [`MockBackend`] serves the QKart REST contract from memory on a random
//! local port, so the real [`qkart_client::HttpBackend`] can be exercised
//! without a running backend. It counts requests per endpoint and can be told
//! to fail catalog or cart reads.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p qkart-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = MockBackend::start().await;
//! backend.add_user("crio.do", "learnbydoing", 5000);
//!
//! let shop = backend.storefront();
//! shop.login("crio.do", "learnbydoing").await?;
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use qkart_client::{ClientConfig, HttpBackend, MemoryStore, Storefront};
use qkart_core::{Address, AddressId, CartEntry, Price, Product, ProductId, Rating};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Debounce window used by [`MockBackend::config`].
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(50);

/// Per-endpoint request counters.
#[derive(Debug, Default)]
pub struct Counters {
    /// `GET /products`
    pub products: AtomicUsize,
    /// `GET /products/search`
    pub search: AtomicUsize,
    /// `GET /cart`
    pub cart_reads: AtomicUsize,
    /// `POST /cart`
    pub cart_writes: AtomicUsize,
    /// `POST /cart/checkout`
    pub checkouts: AtomicUsize,
}

impl Counters {
    fn hit(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Read a counter.
    #[must_use]
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct User {
    password: String,
    balance: Decimal,
    cart: Vec<CartEntry>,
    addresses: Vec<Address>,
}

#[derive(Default)]
struct Inner {
    products: Vec<Product>,
    users: Mutex<HashMap<String, User>>,
    tokens: Mutex<HashMap<String, String>>,
    fail_products: AtomicBool,
    fail_cart_reads: AtomicBool,
    searches: Mutex<Vec<String>>,
    counters: Counters,
}

/// Shared state of the in-memory backend.
#[derive(Clone)]
pub struct BackendState(Arc<Inner>);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The default catalog.
#[must_use]
pub fn sample_products() -> Vec<Product> {
    let product = |id: &str, name: &str, category: &str, cost: u32, rating: u8| Product {
        id: ProductId::new(id),
        name: name.to_string(),
        category: category.to_string(),
        cost: Price::from_units(cost),
        rating: Rating::new(rating).unwrap_or_default(),
        image_url: format!("https://crio-directus-assets.s3.ap-south-1.amazonaws.com/{id}.png"),
    };

    vec![
        product("BW0jAAeDJmlZCF8i", "Tan Leatherette Weekender Duffle", "Fashion", 150, 4),
        product("KCRwjF7lN97HnEaY", "Bonsai Spirit Tree", "Home & Kitchen", 100, 3),
        product("PmInA797xJhMIPti", "Atan Leather Backpack", "Fashion", 50, 5),
        product("a4sLtEcMpzFKvAXk", "Wireless Headphones", "Electronics", 1200, 4),
        product("upLK9JbQ4rMhTwt4", "Apple iPhone XR (64GB)", "Electronics", 5000, 5),
    ]
}

// =============================================================================
// Responses
// =============================================================================

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "message": message}))).into_response()
}

fn unauthorized() -> Response {
    failure(
        StatusCode::UNAUTHORIZED,
        "Protected route, Oauth2 Bearer token not found",
    )
}

fn cart_json(cart: &[CartEntry]) -> Response {
    Json(cart.to_vec()).into_response()
}

impl BackendState {
    /// Username behind the request's bearer token.
    fn authenticate(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        lock(&self.0.tokens).get(token).cloned()
    }

    /// Run `f` on the authenticated user, or answer 401.
    fn with_user(
        &self,
        headers: &HeaderMap,
        f: impl FnOnce(&mut User) -> Response,
    ) -> Response {
        let Some(username) = self.authenticate(headers) else {
            return unauthorized();
        };
        let mut users = lock(&self.0.users);
        users.get_mut(&username).map_or_else(unauthorized, f)
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_products(State(state): State<BackendState>) -> Response {
    Counters::hit(&state.0.counters.products);
    if state.0.fail_products.load(Ordering::SeqCst) {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
    Json(state.0.products.clone()).into_response()
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    value: String,
}

async fn search_products(
    State(state): State<BackendState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    Counters::hit(&state.0.counters.search);
    lock(&state.0.searches).push(query.value.clone());

    let needle = query.value.to_lowercase();
    let found: Vec<Product> = state
        .0
        .products
        .iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle) || p.category.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    if found.is_empty() {
        return (StatusCode::NOT_FOUND, Json(Vec::<Product>::new())).into_response();
    }
    Json(found).into_response()
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn register(
    State(state): State<BackendState>,
    Json(body): Json<Credentials>,
) -> Response {
    let mut users = lock(&state.0.users);
    if users.contains_key(&body.username) {
        return failure(StatusCode::BAD_REQUEST, "Username is already taken");
    }
    users.insert(
        body.username,
        User {
            password: body.password,
            balance: Decimal::from(5000),
            cart: Vec::new(),
            addresses: Vec::new(),
        },
    );
    (StatusCode::CREATED, Json(json!({"success": true}))).into_response()
}

async fn login(State(state): State<BackendState>, Json(body): Json<Credentials>) -> Response {
    let balance = {
        let users = lock(&state.0.users);
        let Some(user) = users.get(&body.username) else {
            return failure(StatusCode::BAD_REQUEST, "Username does not exist");
        };
        if user.password != body.password {
            return failure(StatusCode::BAD_REQUEST, "Password is incorrect");
        }
        user.balance
    };

    let token = uuid::Uuid::new_v4().to_string();
    lock(&state.0.tokens).insert(token.clone(), body.username.clone());

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "token": token,
            "username": body.username,
            "balance": balance,
        })),
    )
        .into_response()
}

async fn get_cart(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    Counters::hit(&state.0.counters.cart_reads);
    if state.0.fail_cart_reads.load(Ordering::SeqCst) {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
    state.with_user(&headers, |user| cart_json(&user.cart))
}

#[derive(Deserialize)]
struct UpsertBody {
    #[serde(rename = "productId")]
    product_id: ProductId,
    qty: u32,
}

async fn upsert_cart(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<UpsertBody>,
) -> Response {
    Counters::hit(&state.0.counters.cart_writes);
    let known = state.0.products.iter().any(|p| p.id == body.product_id);

    state.with_user(&headers, |user| {
        if !known {
            return failure(StatusCode::NOT_FOUND, "Product doesn't exist");
        }
        if body.qty == 0 {
            user.cart.retain(|e| e.product_id != body.product_id);
        } else if let Some(entry) = user
            .cart
            .iter_mut()
            .find(|e| e.product_id == body.product_id)
        {
            entry.quantity = body.qty;
        } else {
            user.cart.push(CartEntry::new(body.product_id, body.qty));
        }
        cart_json(&user.cart)
    })
}

#[derive(Deserialize)]
struct CheckoutBody {
    #[serde(rename = "addressId")]
    address_id: AddressId,
}

async fn checkout(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Response {
    Counters::hit(&state.0.counters.checkouts);
    let products = state.0.products.clone();

    state.with_user(&headers, |user| {
        if user.cart.is_empty() {
            return failure(StatusCode::BAD_REQUEST, "Cart is empty");
        }
        if !user.addresses.iter().any(|a| a.id == body.address_id) {
            return failure(StatusCode::BAD_REQUEST, "Bad Request");
        }

        let total: Decimal = user
            .cart
            .iter()
            .filter_map(|entry| {
                products
                    .iter()
                    .find(|p| p.id == entry.product_id)
                    .map(|p| p.cost.amount() * Decimal::from(entry.quantity))
            })
            .sum();
        if total > user.balance {
            return failure(
                StatusCode::BAD_REQUEST,
                "Wallet balance not sufficient to place order",
            );
        }

        user.balance -= total;
        user.cart.clear();
        Json(json!({"success": true})).into_response()
    })
}

async fn list_addresses(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    state.with_user(&headers, |user| Json(user.addresses.clone()).into_response())
}

#[derive(Deserialize)]
struct AddressBody {
    address: String,
}

async fn add_address(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Json(body): Json<AddressBody>,
) -> Response {
    state.with_user(&headers, |user| {
        if body.address.len() < 20 {
            return failure(
                StatusCode::BAD_REQUEST,
                "\"address\" length must be at least 20 characters long",
            );
        }
        user.addresses.push(Address {
            id: AddressId::new(uuid::Uuid::new_v4().to_string()),
            address: body.address,
        });
        Json(user.addresses.clone()).into_response()
    })
}

async fn delete_address(
    State(state): State<BackendState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    state.with_user(&headers, |user| {
        let before = user.addresses.len();
        user.addresses.retain(|a| a.id.as_str() != id);
        if user.addresses.len() == before {
            return failure(StatusCode::NOT_FOUND, "Address to delete was not found");
        }
        Json(user.addresses.clone()).into_response()
    })
}

/// The QKart API routes, mounted at `/api/v1`.
pub fn routes(state: BackendState) -> Router {
    let api = Router::new()
        .route("/products", get(list_products))
        .route("/products/search", get(search_products))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/cart", get(get_cart).post(upsert_cart))
        .route("/cart/checkout", post(checkout))
        .route("/user/addresses", get(list_addresses).post(add_address))
        .route("/user/addresses/{id}", delete(delete_address));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// MockBackend
// =============================================================================

/// In-memory QKart backend listening on a random local port.
///
/// The server task is aborted on drop.
pub struct MockBackend {
    state: BackendState,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend serving [`sample_products`].
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        Self::start_with(sample_products()).await
    }

    /// Start a backend serving `products`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start_with(products: Vec<Product>) -> Self {
        init_tracing();

        let state = BackendState(Arc::new(Inner {
            products,
            ..Inner::default()
        }));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Failed to read local address");

        let app = routes(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "mock backend stopped");
            }
        });

        Self {
            state,
            addr,
            server,
        }
    }

    /// Base URL of the API, e.g. `http://127.0.0.1:PORT/api/v1`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Client configuration pointing at this backend, with a short debounce.
    ///
    /// # Panics
    ///
    /// Panics if the endpoint is not a valid URL.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config =
            ClientConfig::for_endpoint(&self.endpoint()).expect("Mock endpoint is a valid URL");
        config.search_debounce = TEST_DEBOUNCE;
        config.http_timeout = Duration::from_secs(5);
        config
    }

    /// An HTTP client for this backend.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn http(&self) -> HttpBackend {
        HttpBackend::new(&self.config()).expect("Failed to build HTTP client")
    }

    /// A storefront with in-memory local state.
    ///
    /// # Panics
    ///
    /// Panics if the storefront cannot be built.
    #[must_use]
    pub fn storefront(&self) -> Storefront<HttpBackend> {
        Storefront::new(self.config(), self.http(), Arc::new(MemoryStore::new()))
            .expect("Failed to build storefront")
    }

    /// Register a user directly.
    pub fn add_user(&self, username: &str, password: &str, balance: u32) {
        lock(&self.state.0.users).insert(
            username.to_string(),
            User {
                password: password.to_string(),
                balance: Decimal::from(balance),
                cart: Vec::new(),
                addresses: Vec::new(),
            },
        );
    }

    /// Server-side cart of `username`.
    #[must_use]
    pub fn cart_of(&self, username: &str) -> Vec<CartEntry> {
        lock(&self.state.0.users)
            .get(username)
            .map(|u| u.cart.clone())
            .unwrap_or_default()
    }

    /// Server-side wallet balance of `username`.
    #[must_use]
    pub fn balance_of(&self, username: &str) -> Option<Decimal> {
        lock(&self.state.0.users).get(username).map(|u| u.balance)
    }

    /// Replace the server-side cart of `username` (another device, say).
    pub fn set_cart(&self, username: &str, cart: Vec<CartEntry>) {
        if let Some(user) = lock(&self.state.0.users).get_mut(username) {
            user.cart = cart;
        }
    }

    /// Make `GET /products` fail with 500.
    pub fn fail_products(&self, fail: bool) {
        self.state.0.fail_products.store(fail, Ordering::SeqCst);
    }

    /// Make `GET /cart` fail with 500.
    pub fn fail_cart_reads(&self, fail: bool) {
        self.state.0.fail_cart_reads.store(fail, Ordering::SeqCst);
    }

    /// Request counters.
    #[must_use]
    pub fn counters(&self) -> &Counters {
        &self.state.0.counters
    }

    /// Search texts received, in arrival order.
    #[must_use]
    pub fn searches(&self) -> Vec<String> {
        lock(&self.state.0.searches).clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Log to the test harness when `RUST_LOG` is set.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "off".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
