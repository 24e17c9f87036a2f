//! Command implementations.
//!
//! Each command opens the storefront against the configured backend, runs
//! one user action and prints the result. Failures are printed as a single
//! notification line and the process exits non-zero.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

use std::fmt;
use std::sync::Arc;

use qkart_client::{
    ApiError, ClientConfig, ClientError, FileStore, HttpBackend, StorageError, Storefront,
};
use qkart_core::{CartTotals, LineItem, Product};
use thiserror::Error;

/// The storefront every command runs against.
pub type Shop = Storefront<HttpBackend>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The HTTP client could not be built.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The state file could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The storefront rejected the action.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Reading standard input failed.
    #[error("Could not read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the storefront, restoring the persisted session.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the state file
/// cannot be read.
pub fn open(config: ClientConfig) -> Result<Shop, CommandError> {
    let api = HttpBackend::new(&config)?;
    let store = FileStore::open(&config.state_path)?;
    tracing::debug!(path = %store.path().display(), "restoring session");
    let store = Arc::new(store);
    Ok(Storefront::new(config, api, store)?)
}

/// Print `err` as a notification and exit with status 1.
#[allow(clippy::print_stderr)]
pub fn fail(err: &dyn fmt::Display) -> ! {
    tracing::debug!("command failed: {err}");
    eprintln!("error: {err}");
    std::process::exit(1);
}

/// One product per line: id, name, category, price and rating.
#[allow(clippy::print_stdout)]
pub fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for p in products {
        println!(
            "{:<18} {:<40} {:<12} {:>8}  {}",
            p.id, p.name, p.category, p.cost.to_string(), p.rating
        );
    }
}

/// Cart lines followed by totals.
#[allow(clippy::print_stdout)]
pub fn print_cart(items: &[LineItem], totals: &CartTotals) {
    if items.is_empty() {
        println!("Cart is empty. Add more items to the cart to checkout.");
        return;
    }
    for item in items {
        println!(
            "{:<18} {:<40} {:>3} x {:>8} = {:>9}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.product.cost.to_string(),
            item.subtotal().to_string()
        );
    }
    println!(
        "Total: {} ({} item{})",
        totals.total_value,
        totals.total_quantity,
        if totals.total_quantity == 1 { "" } else { "s" }
    );
}
