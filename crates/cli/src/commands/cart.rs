//! Cart commands.
//!
//! Every command loads the catalog and the backend's cart first so that
//! decisions (duplicate check, increments) are made against fresh state.

use qkart_core::ProductId;

use super::{CommandError, Shop, print_cart};

async fn prepare(shop: &Shop) -> Result<(), CommandError> {
    shop.load_catalog().await?;
    shop.refresh_cart().await?;
    Ok(())
}

fn print_view(shop: &Shop) {
    let view = shop.cart_view();
    print_cart(&view.items, &view.totals);
}

/// `qkart cart show`
///
/// # Errors
///
/// Returns an error if the catalog or the cart cannot be fetched.
pub async fn show(shop: &Shop) -> Result<(), CommandError> {
    prepare(shop).await?;
    print_view(shop);
    Ok(())
}

/// `qkart cart add <id> [--qty N]`
///
/// # Errors
///
/// Returns an error if the product is already in the cart or the backend
/// rejects the change.
#[allow(clippy::print_stdout)]
pub async fn add(shop: &Shop, product_id: &ProductId, qty: u32) -> Result<(), CommandError> {
    prepare(shop).await?;
    shop.add_to_cart(product_id, qty).await?;
    println!("Item added to cart");
    print_view(shop);
    Ok(())
}

/// `qkart cart set <id> <qty>`
///
/// # Errors
///
/// Returns an error if the backend rejects the change.
pub async fn set(shop: &Shop, product_id: &ProductId, qty: i64) -> Result<(), CommandError> {
    prepare(shop).await?;
    shop.set_quantity(product_id, qty).await?;
    print_view(shop);
    Ok(())
}

/// `qkart cart inc <id>`
///
/// # Errors
///
/// Returns an error if the backend rejects the change.
pub async fn increment(shop: &Shop, product_id: &ProductId) -> Result<(), CommandError> {
    prepare(shop).await?;
    shop.increment(product_id).await?;
    print_view(shop);
    Ok(())
}

/// `qkart cart dec <id>`
///
/// # Errors
///
/// Returns an error if the backend rejects the change.
pub async fn decrement(shop: &Shop, product_id: &ProductId) -> Result<(), CommandError> {
    prepare(shop).await?;
    shop.decrement(product_id).await?;
    print_view(shop);
    Ok(())
}
