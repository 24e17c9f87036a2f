//! Registration, login lifecycle, addresses and checkout.
//!
//! Run with: cargo test -p qkart-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use qkart_client::{ClientError, FileStore, Storefront};
use qkart_core::{CredentialError, Price};
use qkart_integration_tests::{Counters, MockBackend};
use rust_decimal::Decimal;

const DUFFLE: &str = "BW0jAAeDJmlZCF8i";
const HEADPHONES: &str = "a4sLtEcMpzFKvAXk";
const ADDRESS: &str = "221B Baker Street, London NW1 6XE";

#[tokio::test]
async fn test_register_then_login() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();

    shop.register("crio.do", "learnbydoing", "learnbydoing")
        .await
        .expect("Failed to register");
    shop.login("crio.do", "learnbydoing")
        .await
        .expect("Failed to log in");

    assert_eq!(shop.session().username().as_deref(), Some("crio.do"));
    assert_eq!(shop.session().balance(), Some(Price::from_units(5000)));
}

#[tokio::test]
async fn test_register_validation_happens_locally() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();

    let err = shop.register("crio", "learnbydoing", "learnbydoing").await.unwrap_err();
    assert_eq!(err.to_string(), "Username must be at least 6 characters");

    let err = shop.register("crio.do", "learn", "learn").await.unwrap_err();
    assert_eq!(err.to_string(), "Password must be at least 6 characters");

    let err = shop.register("crio.do", "learnbydoing", "learnbyreading").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Credentials(CredentialError::PasswordMismatch)
    ));
}

#[tokio::test]
async fn test_register_taken_username_shows_server_message() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();

    let err = shop
        .register("crio.do", "learnbydoing", "learnbydoing")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Username is already taken");
}

#[tokio::test]
async fn test_login_failures() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();

    let err = shop.login("", "learnbydoing").await.unwrap_err();
    assert_eq!(err.to_string(), "Username is a required field");

    let err = shop.login("crio.do", "wrong-password").await.unwrap_err();
    assert_eq!(err.to_string(), "Password is incorrect");
    assert!(!shop.session().is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_session_and_cart() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();
    shop.load_catalog().await.expect("Failed to load catalog");
    shop.login("crio.do", "learnbydoing").await.expect("login");
    shop.add_to_cart(&DUFFLE.into(), 1).await.expect("add");

    shop.logout().expect("logout");

    assert!(!shop.session().is_authenticated());
    assert!(shop.cart_view().is_empty());
    // The server keeps the cart for the next login
    assert_eq!(backend.cart_of("crio.do").len(), 1);
}

#[tokio::test]
async fn test_session_survives_restart() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");

    {
        let store = Arc::new(FileStore::open(&path).expect("open store"));
        let shop = Storefront::new(backend.config(), backend.http(), store).expect("storefront");
        shop.load_catalog().await.expect("catalog");
        shop.login("crio.do", "learnbydoing").await.expect("login");
        shop.add_to_cart(&DUFFLE.into(), 3).await.expect("add");
    }

    let store = Arc::new(FileStore::open(&path).expect("reopen store"));
    let shop = Storefront::new(backend.config(), backend.http(), store).expect("storefront");
    assert_eq!(shop.session().username().as_deref(), Some("crio.do"));

    // The cached cart is priced as soon as the catalog arrives
    shop.load_catalog().await.expect("catalog");
    assert_eq!(shop.cart_view().totals.total_value, Price::from_units(450));
}

#[tokio::test]
async fn test_address_book() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();
    shop.login("crio.do", "learnbydoing").await.expect("login");

    let err = shop.add_address("Baker Street").await.unwrap_err();
    assert_eq!(err.to_string(), "Address should be greater than 20 characters");

    let addresses = shop.add_address(ADDRESS).await.expect("add address");
    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].address, ADDRESS);

    let addresses = shop.delete_address(&addresses[0].id).await.expect("delete");
    assert!(addresses.is_empty());
}

#[tokio::test]
async fn test_addresses_require_login() {
    let backend = MockBackend::start().await;
    let shop = backend.storefront();

    let err = shop.addresses().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));
}

#[tokio::test]
async fn test_checkout_deducts_balance_and_empties_cart() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();
    shop.load_catalog().await.expect("catalog");
    shop.login("crio.do", "learnbydoing").await.expect("login");
    shop.add_to_cart(&DUFFLE.into(), 2).await.expect("add");
    let address = shop.add_address(ADDRESS).await.expect("address")[0].id.clone();

    let summary = shop.order_summary();
    assert_eq!(summary.total, Price::from_units(300));
    assert_eq!(summary.shipping, Price::ZERO);

    let remaining = shop.checkout(&address).await.expect("checkout");

    assert_eq!(remaining, Price::from_units(4700));
    assert_eq!(shop.session().balance(), Some(Price::from_units(4700)));
    assert!(shop.cart_view().is_empty());
    assert!(backend.cart_of("crio.do").is_empty());
    assert_eq!(backend.balance_of("crio.do"), Some(Decimal::from(4700)));
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_rejected_locally() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();
    shop.login("crio.do", "learnbydoing").await.expect("login");
    let address = shop.add_address(ADDRESS).await.expect("address")[0].id.clone();

    let err = shop.checkout(&address).await.unwrap_err();

    assert!(matches!(err, ClientError::EmptyCart));
    assert_eq!(Counters::get(&backend.counters().checkouts), 0);
}

#[tokio::test]
async fn test_checkout_over_balance_is_rejected_locally() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 1000);
    let shop = backend.storefront();
    shop.load_catalog().await.expect("catalog");
    shop.login("crio.do", "learnbydoing").await.expect("login");
    shop.add_to_cart(&HEADPHONES.into(), 1).await.expect("add");
    let address = shop.add_address(ADDRESS).await.expect("address")[0].id.clone();

    let err = shop.checkout(&address).await.unwrap_err();

    assert!(matches!(err, ClientError::InsufficientBalance { .. }));
    assert_eq!(Counters::get(&backend.counters().checkouts), 0);
    assert_eq!(shop.cart_view().items.len(), 1);
}

#[tokio::test]
async fn test_checkout_to_unknown_address_shows_server_message() {
    let backend = MockBackend::start().await;
    backend.add_user("crio.do", "learnbydoing", 5000);
    let shop = backend.storefront();
    shop.load_catalog().await.expect("catalog");
    shop.login("crio.do", "learnbydoing").await.expect("login");
    shop.add_to_cart(&DUFFLE.into(), 1).await.expect("add");

    let err = shop.checkout(&"nowhere".into()).await.unwrap_err();

    assert_eq!(err.to_string(), "Bad Request");
    assert_eq!(shop.cart_view().items.len(), 1);
    assert_eq!(shop.session().balance(), Some(Price::from_units(5000)));
}
