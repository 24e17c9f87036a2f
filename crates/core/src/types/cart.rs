//! Cart types.
//!
//! The backend stores a *sparse* cart: one `{productId, qty}` pair per
//! product the user has added. The client enriches it with catalog data to
//! get [`LineItem`]s and [`CartTotals`] for display.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::product::Product;

/// A single sparse cart record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartEntry {
    /// Product in the cart.
    #[serde(rename = "productId")]
    pub product_id: ProductId,
    /// How many units of the product are in the cart.
    #[serde(rename = "qty")]
    pub quantity: u32,
}

impl CartEntry {
    /// Create a new cart entry.
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// The user's cart as a list of product/quantity pairs.
///
/// ## Invariants
///
/// - No two entries share a product id. When built from a list that
///   repeats an id, the last occurrence wins and keeps its position.
/// - Every entry has a quantity of at least one; zero-quantity entries are
///   dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CartEntry>", into = "Vec<CartEntry>")]
pub struct SparseCart(Vec<CartEntry>);

impl SparseCart {
    /// Create an empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a cart from raw entries, enforcing the cart invariants.
    #[must_use]
    pub fn new(entries: Vec<CartEntry>) -> Self {
        let mut unique: Vec<CartEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.quantity == 0 {
                continue;
            }
            match unique.iter_mut().find(|e| e.product_id == entry.product_id) {
                Some(existing) => existing.quantity = entry.quantity,
                None => unique.push(entry),
            }
        }
        Self(unique)
    }

    /// Whether the product is already in the cart.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.0.iter().any(|e| &e.product_id == product_id)
    }

    /// Quantity of the product in the cart, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.0
            .iter()
            .find(|e| &e.product_id == product_id)
            .map(|e| e.quantity)
    }

    /// Entries in server order.
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.0
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, CartEntry> {
        self.0.iter()
    }
}

impl From<Vec<CartEntry>> for SparseCart {
    fn from(entries: Vec<CartEntry>) -> Self {
        Self::new(entries)
    }
}

impl From<SparseCart> for Vec<CartEntry> {
    fn from(cart: SparseCart) -> Self {
        cart.0
    }
}

impl FromIterator<CartEntry> for SparseCart {
    fn from_iter<I: IntoIterator<Item = CartEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SparseCart {
    type Item = &'a CartEntry;
    type IntoIter = std::slice::Iter<'a, CartEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A cart entry enriched with full product data.
///
/// Derived on every merge and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    /// Product data from the catalog.
    #[serde(flatten)]
    pub product: Product,
    /// Quantity in the cart.
    #[serde(rename = "qty")]
    pub quantity: u32,
}

impl LineItem {
    /// Cost of this line (`cost * quantity`).
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.product.cost * self.quantity
    }
}

/// Aggregate values for a list of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartTotals {
    /// Sum of `cost * quantity` over all items.
    pub total_value: Price,
    /// Sum of quantities over all items.
    pub total_quantity: u64,
}
