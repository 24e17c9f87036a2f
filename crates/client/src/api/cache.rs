//! Cache types for catalog responses.

use std::sync::Arc;

use qkart_core::Product;

/// Cache key for catalog listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Search(String),
}

/// Cached value: a shared product list.
pub type CacheValue = Arc<Vec<Product>>;
