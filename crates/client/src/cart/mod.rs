//! Shopping cart.
//!
//! The backend owns the cart. The client keeps a sparse copy (product id and
//! quantity pairs) in a [`CartCache`], replaces it wholesale with whatever the
//! backend returns after each mutation, and re-derives priced line items from
//! it and the catalog with [`merge`].

mod cache;
mod coordinator;
pub mod merge;

use qkart_core::{CartTotals, LineItem, Product, SparseCart};
use serde::Serialize;

pub use cache::{CartCache, CartSnapshot};
pub use coordinator::{CartMutationCoordinator, MutationOptions, MutationState};
pub use merge::merge;

/// Priced cart contents, ready to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Line items in catalog order.
    pub items: Vec<LineItem>,
    /// Totals over `items`.
    pub totals: CartTotals,
}

impl CartView {
    /// Merge `cart` with `catalog` and compute totals.
    #[must_use]
    pub fn build(cart: &SparseCart, catalog: &[Product]) -> Self {
        let items = merge::merge(cart, catalog);
        let totals = merge::totals(&items);
        Self { items, totals }
    }

    /// Whether the view has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
