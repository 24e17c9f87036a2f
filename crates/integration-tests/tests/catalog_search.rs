//! Catalog loading and debounced search over HTTP.
//!
//! Run with: cargo test -p qkart-integration-tests

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use qkart_client::{CatalogApi, ClientError};
use qkart_integration_tests::{Counters, MockBackend, TEST_DEBOUNCE};

#[tokio::test]
async fn test_load_catalog() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();

    let products = shop.load_catalog().await.expect("catalog");

    assert_eq!(products.len(), 5);
    assert_eq!(products[0].name, "Tan Leatherette Weekender Duffle");
}

#[tokio::test]
async fn test_catalog_is_cached() {
    let backend = MockBackend::start().await;
    let api = backend.http();

    api.products().await.expect("first");
    api.products().await.expect("second");
    assert_eq!(Counters::get(&backend.counters().products), 1);

    api.invalidate_catalog();
    api.products().await.expect("third");
    assert_eq!(Counters::get(&backend.counters().products), 2);
}

#[tokio::test]
async fn test_catalog_failure_is_fetch_failed() {
    let backend = MockBackend::start().await;
    backend.fail_products(true);
    let shop = backend.storefront();

    let err = shop.load_catalog().await.unwrap_err();

    assert!(matches!(err, ClientError::FetchFailed(_)));
    assert!(shop.catalog().is_empty());
}

#[tokio::test]
async fn test_search_by_category() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();

    let products = shop.search_now("fashion").await;

    assert_eq!(products.len(), 2);
    assert!(products.iter().all(|p| p.category == "Fashion"));
}

#[tokio::test]
async fn test_search_without_matches_is_empty() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();

    assert!(shop.search_now("xyzzy").await.is_empty());
}

#[tokio::test]
async fn test_empty_search_lists_catalog() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();

    assert_eq!(shop.search_now("").await.len(), 5);
    assert_eq!(Counters::get(&backend.counters().search), 0);
}

#[tokio::test]
async fn test_typing_sends_one_search_with_latest_text() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();
    let mut results = shop.subscribe_search();

    for text in ["h", "he", "hea", "head", "headphones"] {
        shop.on_search_input(text);
        tokio::time::sleep(TEST_DEBOUNCE / 5).await;
    }
    tokio::time::timeout(Duration::from_secs(5), results.changed())
        .await
        .expect("search timed out")
        .expect("search channel closed");

    assert_eq!(backend.searches(), ["headphones"]);
    let latest = results.borrow().clone();
    assert_eq!(latest.query, "headphones");
    assert_eq!(latest.products.len(), 1);
}
