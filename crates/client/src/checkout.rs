//! Order summary and checkout preconditions.

use qkart_core::{Address, AddressId, Price};
use serde::Serialize;

use crate::cart::CartView;
use crate::error::ClientError;

/// Shipping is free.
pub const SHIPPING_CHARGES: Price = Price::ZERO;

/// Figures shown next to the checkout button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    /// Number of units in the cart.
    pub products: u64,
    /// Cart value before shipping.
    pub subtotal: Price,
    /// Shipping charges.
    pub shipping: Price,
    /// Amount that will be deducted from the wallet.
    pub total: Price,
}

impl OrderSummary {
    /// Summarize a priced cart.
    #[must_use]
    pub fn of(view: &CartView) -> Self {
        let subtotal = view.totals.total_value;
        Self {
            products: view.totals.total_quantity,
            subtotal,
            shipping: SHIPPING_CHARGES,
            total: subtotal + SHIPPING_CHARGES,
        }
    }
}

/// Check that an order can be placed and return the wallet balance that
/// remains afterwards.
///
/// # Errors
///
/// - [`ClientError::EmptyCart`] when the cart has no line items
/// - [`ClientError::InsufficientBalance`] when the wallet does not cover the
///   total
pub fn validate(view: &CartView, balance: Price) -> Result<Price, ClientError> {
    if view.is_empty() {
        return Err(ClientError::EmptyCart);
    }

    let total = OrderSummary::of(view).total;
    balance
        .checked_sub(total)
        .ok_or(ClientError::InsufficientBalance { total, balance })
}

/// Find `id` among the user's saved addresses.
///
/// # Errors
///
/// Returns [`ClientError::Rejected`] if the address is unknown.
pub fn select_address<'a>(
    addresses: &'a [Address],
    id: &AddressId,
) -> Result<&'a Address, ClientError> {
    addresses
        .iter()
        .find(|a| &a.id == id)
        .ok_or_else(|| ClientError::Rejected("Please select one shipping address to proceed.".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use qkart_core::{CartEntry, Product, ProductId, Rating, SparseCart};

    use super::*;

    fn view(cost: u32, qty: u32) -> CartView {
        let catalog = [Product {
            id: ProductId::new("A"),
            name: "Tan Leatherette Weekender Duffle".to_string(),
            category: "Fashion".to_string(),
            cost: Price::from_units(cost),
            rating: Rating::new(4).unwrap(),
            image_url: String::new(),
        }];
        CartView::build(&SparseCart::new(vec![CartEntry::new("A", qty)]), &catalog)
    }

    #[test]
    fn test_summary() {
        let summary = OrderSummary::of(&view(150, 2));
        assert_eq!(summary.products, 2);
        assert_eq!(summary.subtotal, Price::from_units(300));
        assert_eq!(summary.shipping, Price::ZERO);
        assert_eq!(summary.total, Price::from_units(300));
    }

    #[test]
    fn test_validate_returns_remaining_balance() {
        let remaining = validate(&view(150, 2), Price::from_units(5000)).unwrap();
        assert_eq!(remaining, Price::from_units(4700));
    }

    #[test]
    fn test_exact_balance_is_enough() {
        let remaining = validate(&view(150, 2), Price::from_units(300)).unwrap();
        assert_eq!(remaining, Price::ZERO);
    }

    #[test]
    fn test_empty_cart() {
        let err = validate(&CartView::default(), Price::from_units(5000)).unwrap_err();
        assert!(matches!(err, ClientError::EmptyCart));
    }

    #[test]
    fn test_insufficient_balance() {
        let err = validate(&view(150, 2), Price::from_units(299)).unwrap_err();
        assert!(matches!(
            err,
            ClientError::InsufficientBalance { total, balance }
                if total == Price::from_units(300) && balance == Price::from_units(299)
        ));
    }

    #[test]
    fn test_select_address() {
        let addresses = vec![Address {
            id: AddressId::new("addr-1"),
            address: "221B Baker Street, London NW1 6XE".to_string(),
        }];
        assert!(select_address(&addresses, &"addr-1".into()).is_ok());
        assert!(select_address(&addresses, &"addr-2".into()).is_err());
    }
}
