//! Address and checkout commands.

use qkart_client::checkout::select_address;
use qkart_core::{Address, AddressId};

use super::{CommandError, Shop, print_cart};

#[allow(clippy::print_stdout)]
fn print_addresses(addresses: &[Address]) {
    if addresses.is_empty() {
        println!("No addresses found for this account. Add one to proceed.");
    }
    for a in addresses {
        println!("{:<38} {}", a.id, a.address);
    }
}

/// `qkart address list`
///
/// # Errors
///
/// Returns an error if not logged in or the request fails.
pub async fn list_addresses(shop: &Shop) -> Result<(), CommandError> {
    print_addresses(&shop.addresses().await?);
    Ok(())
}

/// `qkart address add <text>`
///
/// # Errors
///
/// Returns a validation error or the backend's message.
pub async fn add_address(shop: &Shop, text: &str) -> Result<(), CommandError> {
    print_addresses(&shop.add_address(text).await?);
    Ok(())
}

/// `qkart address delete <id>`
///
/// # Errors
///
/// Returns an error if not logged in or the request fails.
pub async fn delete_address(shop: &Shop, address_id: &AddressId) -> Result<(), CommandError> {
    print_addresses(&shop.delete_address(address_id).await?);
    Ok(())
}

/// `qkart checkout <address-id>`
///
/// # Errors
///
/// Returns an error if the address is unknown, the cart is empty, the wallet
/// balance is too low, or the backend rejects the order.
#[allow(clippy::print_stdout)]
pub async fn checkout(shop: &Shop, address_id: &AddressId) -> Result<(), CommandError> {
    shop.load_catalog().await?;
    shop.refresh_cart().await?;

    let addresses = shop.addresses().await?;
    let address = select_address(&addresses, address_id)?;

    let view = shop.cart_view();
    let summary = shop.order_summary();
    print_cart(&view.items, &view.totals);
    println!("Products:         {}", summary.products);
    println!("Subtotal:         {}", summary.subtotal);
    println!("Shipping charges: {}", summary.shipping);
    println!("Total:            {}", summary.total);

    let remaining = shop.checkout(address_id).await?;
    println!("Order placed successfully. Shipping to: {}", address.address);
    println!("Remaining wallet balance: {remaining}");
    Ok(())
}
