//! Cart reconciliation and pricing.
//!
//! Joins the sparse server cart with the product catalog. The catalog is
//! authoritative for ordering; cart entries whose product is not (yet) in
//! the catalog are dropped from the view rather than reported as errors.

use std::collections::{HashMap, HashSet};

use qkart_core::{CartTotals, LineItem, Price, Product, ProductId, SparseCart};

/// Materialize the line items of `cart`, in catalog order.
///
/// The result never holds more than `min(cart.len(), catalog.len())`
/// items. A product listed twice in the catalog is materialized once.
#[must_use]
pub fn merge(cart: &SparseCart, catalog: &[Product]) -> Vec<LineItem> {
    let quantities: HashMap<&ProductId, u32> = cart
        .iter()
        .map(|entry| (&entry.product_id, entry.quantity))
        .collect();
    let mut seen: HashSet<&ProductId> = HashSet::with_capacity(quantities.len());

    catalog
        .iter()
        .filter_map(|product| {
            let quantity = *quantities.get(&product.id)?;
            seen.insert(&product.id).then(|| LineItem {
                product: product.clone(),
                quantity,
            })
        })
        .collect()
}

/// Sum of `cost * quantity`; zero for no items.
#[must_use]
pub fn total_value(items: &[LineItem]) -> Price {
    items.iter().map(LineItem::subtotal).sum()
}

/// Sum of quantities; zero for no items.
#[must_use]
pub fn total_quantity(items: &[LineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}

/// Both totals at once.
#[must_use]
pub fn totals(items: &[LineItem]) -> CartTotals {
    CartTotals {
        total_value: total_value(items),
        total_quantity: total_quantity(items),
    }
}
