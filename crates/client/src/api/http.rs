//! `reqwest` implementation of the QKart backend API.
//!
//! Product listings and search results are cached with `moka` for the
//! configured TTL; cart, auth and address calls always go to the backend.

use std::collections::HashSet;
use std::sync::Arc;

use moka::future::Cache;
use qkart_core::{
    Address, AddressId, AddressText, CartEntry, LoginForm, Product, ProductId, Registration, SparseCart,
};
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::{AddressApi, ApiError, AuthApi, CartApi, CatalogApi, LoginResponse};
use crate::config::ClientConfig;

/// Maximum number of cached catalog responses.
const CACHE_CAPACITY: u64 = 256;

/// How much of an unparseable body is logged.
const LOGGED_BODY_CHARS: usize = 500;

// =============================================================================
// Wire bodies
// =============================================================================

/// Error body: `{"success": false, "message": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Acknowledgement body: `{"success": true}`.
#[derive(Deserialize)]
struct SuccessBody {
    success: bool,
    message: Option<String>,
}

#[derive(Serialize)]
struct CredentialsBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    #[serde(rename = "productId")]
    product_id: &'a ProductId,
    qty: u32,
}

#[derive(Serialize)]
struct CheckoutBody<'a> {
    #[serde(rename = "addressId")]
    address_id: &'a AddressId,
}

#[derive(Serialize)]
struct AddressBody<'a> {
    address: &'a str,
}

/// Product ids that appear more than once in a cart body.
fn duplicate_ids(entries: &[CartEntry]) -> Vec<&ProductId> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut repeated = Vec::new();
    for entry in entries {
        if !seen.insert(&entry.product_id) && !repeated.contains(&&entry.product_id) {
            repeated.push(&entry.product_id);
        }
    }
    repeated
}

/// Build the cart from a server body, keeping the last entry of any
/// repeated product.
fn cart_from_entries(entries: Vec<CartEntry>) -> SparseCart {
    let repeated = duplicate_ids(&entries);
    if !repeated.is_empty() {
        tracing::warn!(
            product_ids = ?repeated,
            "backend returned duplicate cart entries, keeping the last of each"
        );
    }
    SparseCart::new(entries)
}

// =============================================================================
// HttpBackend
// =============================================================================

/// HTTP client for the QKart backend.
///
/// Cheaply cloneable; clones share the connection pool and the cache.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    base: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl HttpBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client,
                base: config.api_endpoint.clone(),
                cache,
            }),
        })
    }

    /// Drop every cached catalog and search response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Build an endpoint URL from path segments below the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidEndpoint(self.inner.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode a JSON body, mapping non-success statuses
    /// to [`ApiError::Status`].
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message);
            tracing::warn!(
                status = %status,
                message = message.as_deref().unwrap_or(""),
                "QKart API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                "Failed to parse QKart API response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    /// Send a request whose body is a `{success, message}` acknowledgement.
    async fn send_ack(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let ack: SuccessBody = self.send(request).await?;
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: 200,
                message: ack.message,
            })
        }
    }

    /// Fetch a product list through the cache.
    async fn cached_products(&self, key: CacheKey, url: Url) -> Result<Vec<Product>, ApiError> {
        if let Some(cached) = self.inner.cache.get(&key).await {
            debug!(?key, "catalog cache hit");
            return Ok(cached.as_ref().clone());
        }

        let products: Vec<Product> = self.send(self.inner.client.get(url)).await?;
        self.inner
            .cache
            .insert(key, Arc::new(products.clone()))
            .await;
        Ok(products)
    }
}

impl CatalogApi for HttpBackend {
    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.endpoint(&["products"])?;
        self.cached_products(CacheKey::Products, url).await
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let mut url = self.endpoint(&["products", "search"])?;
        url.query_pairs_mut().append_pair("value", query);
        self.cached_products(CacheKey::Search(query.to_string()), url)
            .await
    }
}

impl CartApi for HttpBackend {
    #[instrument(skip(self, token))]
    async fn fetch_cart(&self, token: &SecretString) -> Result<SparseCart, ApiError> {
        let url = self.endpoint(&["cart"])?;
        let request = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret());
        self.send(request).await.map(cart_from_entries)
    }

    #[instrument(skip(self, token, product_id), fields(product_id = %product_id))]
    async fn upsert_cart(
        &self,
        token: &SecretString,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<SparseCart, ApiError> {
        let url = self.endpoint(&["cart"])?;
        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&UpsertBody {
                product_id,
                qty: quantity,
            });
        self.send(request).await.map(cart_from_entries)
    }

    #[instrument(skip(self, token, address_id), fields(address_id = %address_id))]
    async fn checkout(&self, token: &SecretString, address_id: &AddressId) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "checkout"])?;
        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&CheckoutBody { address_id });
        self.send_ack(request).await
    }
}

impl AuthApi for HttpBackend {
    #[instrument(skip(self, form), fields(username = %form.username))]
    async fn register(&self, form: &Registration) -> Result<(), ApiError> {
        let url = self.endpoint(&["auth", "register"])?;
        let request = self.inner.client.post(url).json(&CredentialsBody {
            username: form.username.as_str(),
            password: form.password.expose(),
        });
        self.send_ack(request).await
    }

    #[instrument(skip(self, form), fields(username = %form.username))]
    async fn login(&self, form: &LoginForm) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&["auth", "login"])?;
        let request = self.inner.client.post(url).json(&CredentialsBody {
            username: form.username.as_str(),
            password: form.password.expose(),
        });
        self.send(request).await
    }
}

impl AddressApi for HttpBackend {
    #[instrument(skip(self, token))]
    async fn addresses(&self, token: &SecretString) -> Result<Vec<Address>, ApiError> {
        let url = self.endpoint(&["user", "addresses"])?;
        let request = self
            .inner
            .client
            .get(url)
            .bearer_auth(token.expose_secret());
        self.send(request).await
    }

    #[instrument(skip(self, token, address))]
    async fn add_address(
        &self,
        token: &SecretString,
        address: &AddressText,
    ) -> Result<Vec<Address>, ApiError> {
        let url = self.endpoint(&["user", "addresses"])?;
        let request = self
            .inner
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&AddressBody {
                address: address.as_str(),
            });
        self.send(request).await
    }

    #[instrument(skip(self, token, address_id), fields(address_id = %address_id))]
    async fn delete_address(
        &self,
        token: &SecretString,
        address_id: &AddressId,
    ) -> Result<Vec<Address>, ApiError> {
        let url = self.endpoint(&["user", "addresses", address_id.as_str()])?;
        let request = self
            .inner
            .client
            .delete(url)
            .bearer_auth(token.expose_secret());
        self.send(request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn backend(endpoint: &str) -> HttpBackend {
        HttpBackend::new(&ClientConfig::for_endpoint(endpoint).unwrap()).unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let api = backend("https://qkart.example.com/api/v1");
        let url = api.endpoint(&["products", "search"]).unwrap();
        assert_eq!(url.as_str(), "https://qkart.example.com/api/v1/products/search");
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let api = backend("https://qkart.example.com/api/v1/");
        let url = api.endpoint(&["cart"]).unwrap();
        assert_eq!(url.as_str(), "https://qkart.example.com/api/v1/cart");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let api = backend("http://localhost:8082/api/v1");
        let url = api.endpoint(&["user", "addresses", "a b/c"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8082/api/v1/user/addresses/a%20b%2Fc"
        );
    }

    #[test]
    fn test_duplicate_cart_entries_keep_last() {
        let entries: Vec<CartEntry> = serde_json::from_str(
            r#"[{"productId": "a", "qty": 1},
                {"productId": "b", "qty": 2},
                {"productId": "a", "qty": 5},
                {"productId": "a", "qty": 7}]"#,
        )
        .unwrap();

        assert_eq!(duplicate_ids(&entries), [&ProductId::new("a")]);

        let cart = cart_from_entries(entries);
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity_of(&ProductId::new("a")), Some(7));
        assert_eq!(cart.quantity_of(&ProductId::new("b")), Some(2));
    }

    #[test]
    fn test_unique_cart_entries_are_not_flagged() {
        let entries = vec![CartEntry::new("a", 1), CartEntry::new("b", 0)];
        assert!(duplicate_ids(&entries).is_empty());
    }

    #[test]
    fn test_upsert_body_wire_names() {
        let id = ProductId::new("BW0jAAeDJmlZCF8i");
        let body = serde_json::to_value(UpsertBody {
            product_id: &id,
            qty: 2,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"productId": "BW0jAAeDJmlZCF8i", "qty": 2})
        );
    }
}
