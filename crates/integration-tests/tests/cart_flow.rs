//! Cart reconciliation and mutation against the in-memory backend.
//!
//! Run with: cargo test -p qkart-integration-tests

#![allow(clippy::unwrap_used)]

use qkart_client::api::LoginResponse;
use qkart_client::{ClientError, HttpBackend, Storefront};
use qkart_core::{CartEntry, Price, ProductId};
use qkart_integration_tests::{Counters, MockBackend};

const DUFFLE: &str = "BW0jAAeDJmlZCF8i";
const BONSAI: &str = "KCRwjF7lN97HnEaY";
const BACKPACK: &str = "PmInA797xJhMIPti";

async fn logged_in(backend: &MockBackend) -> Storefront<HttpBackend> {
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();
    shop.load_catalog().await.expect("Failed to load catalog");
    shop.login("crio.do", "learnbydoing")
        .await
        .expect("Failed to log in");
    shop
}

#[tokio::test]
async fn test_add_to_cart_prices_line_items() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;

    shop.add_to_cart(&DUFFLE.into(), 2).await.expect("add duffle");
    let view = shop.add_to_cart(&BACKPACK.into(), 1).await.expect("add backpack");

    assert_eq!(view.items.len(), 2);
    assert_eq!(view.totals.total_value, Price::from_units(350));
    assert_eq!(view.totals.total_quantity, 3);
    assert_eq!(shop.cart_view(), view);
    assert_eq!(backend.cart_of("crio.do").len(), 2);
}

#[tokio::test]
async fn test_line_items_follow_catalog_order() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;

    shop.add_to_cart(&BACKPACK.into(), 1).await.expect("add backpack");
    let view = shop.add_to_cart(&DUFFLE.into(), 1).await.expect("add duffle");

    let ids: Vec<&str> = view.items.iter().map(|i| i.product.id.as_str()).collect();
    assert_eq!(ids, [DUFFLE, BACKPACK]);
}

#[tokio::test]
async fn test_duplicate_add_is_rejected_without_request() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;
    shop.add_to_cart(&DUFFLE.into(), 1).await.expect("add duffle");
    let writes = Counters::get(&backend.counters().cart_writes);

    let err = shop.add_to_cart(&DUFFLE.into(), 1).await.unwrap_err();

    assert!(matches!(err, ClientError::DuplicateItem));
    assert_eq!(Counters::get(&backend.counters().cart_writes), writes);
    assert_eq!(shop.cart_view().totals.total_quantity, 1);
}

#[tokio::test]
async fn test_add_without_login_is_unauthenticated() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();
    shop.load_catalog().await.expect("Failed to load catalog");

    let err = shop.add_to_cart(&DUFFLE.into(), 1).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthenticated));
    assert_eq!(err.to_string(), "Login to add an item to the Cart.");
    assert_eq!(Counters::get(&backend.counters().cart_writes), 0);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;

    let err = shop
        .add_to_cart(&ProductId::new("does-not-exist"), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::ProductNotFound));
    assert!(shop.cart_view().is_empty());
}

#[tokio::test]
async fn test_increment_and_decrement_to_removal() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;
    shop.add_to_cart(&BONSAI.into(), 1).await.expect("add bonsai");

    let view = shop.increment(&BONSAI.into()).await.expect("increment");
    assert_eq!(view.items[0].quantity, 2);
    assert_eq!(view.totals.total_value, Price::from_units(200));

    shop.decrement(&BONSAI.into()).await.expect("decrement");
    let view = shop.decrement(&BONSAI.into()).await.expect("decrement to zero");

    assert!(view.is_empty());
    assert_eq!(view.totals.total_value, Price::ZERO);
    assert!(backend.cart_of("crio.do").is_empty());
}

#[tokio::test]
async fn test_set_quantity_zero_for_absent_product_is_noop() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;

    let view = shop.set_quantity(&BONSAI.into(), 0).await.expect("noop");

    assert!(view.is_empty());
    assert_eq!(Counters::get(&backend.counters().cart_writes), 0);
}

#[tokio::test]
async fn test_server_cart_is_authoritative() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;
    shop.add_to_cart(&DUFFLE.into(), 1).await.expect("add duffle");

    // Another device changed the cart; the next mutation returns the whole list
    backend.set_cart(
        "crio.do",
        vec![CartEntry::new(DUFFLE, 1), CartEntry::new(BONSAI, 4)],
    );
    let view = shop.add_to_cart(&BACKPACK.into(), 1).await.expect("add backpack");

    assert_eq!(view.items.len(), 3);
    assert_eq!(view.totals.total_quantity, 6);
}

#[tokio::test]
async fn test_cart_entries_missing_from_catalog_are_dropped() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;
    backend.set_cart(
        "crio.do",
        vec![CartEntry::new(DUFFLE, 2), CartEntry::new("retired-product", 7)],
    );

    let view = shop.refresh_cart().await.expect("refresh");

    assert_eq!(view.items.len(), 1);
    assert_eq!(view.totals.total_quantity, 2);
}

#[tokio::test]
async fn test_cart_fetch_failure_shows_empty_cart() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;
    shop.add_to_cart(&DUFFLE.into(), 1).await.expect("add duffle");
    backend.fail_cart_reads(true);

    let err = shop.refresh_cart().await.unwrap_err();

    assert!(matches!(err, ClientError::FetchFailed(_)));
    assert!(shop.cart_view().is_empty());
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();
    shop.session()
        .login(LoginResponse {
            token: "not-a-token".to_string(),
            username: "crio.do".to_string(),
            balance: Price::from_units(5000),
        })
        .expect("Failed to start session");

    let err = shop.refresh_cart().await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthenticated));
    assert!(shop.cart_view().is_empty());
}

#[tokio::test]
async fn test_repeated_server_entries_keep_last_quantity() {
    let backend = MockBackend::start().await;
    let shop = logged_in(&backend).await;
    backend.set_cart(
        "crio.do",
        vec![
            CartEntry::new(DUFFLE, 1),
            CartEntry::new(BONSAI, 2),
            CartEntry::new(DUFFLE, 4),
        ],
    );

    let view = shop.refresh_cart().await.expect("refresh");

    assert_eq!(view.items.len(), 2);
    assert_eq!(view.totals.total_quantity, 6);
    assert_eq!(view.totals.total_value, Price::from_units(800));
    assert_eq!(
        shop.session().cart().cart.quantity_of(&ProductId::new(DUFFLE)),
        Some(4)
    );
}
