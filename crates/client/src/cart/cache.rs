//! Single source of truth for the client's copy of the sparse cart.
//!
//! Every replacement bumps a generation counter. A writer that read the
//! cart at generation `n` may only commit while the cache is still at `n`;
//! anything else means a newer cart was stored in the meantime (login,
//! logout, refresh or another mutation) and the write is rejected.

use std::sync::{Mutex, MutexGuard, PoisonError};

use qkart_core::SparseCart;

/// A cart together with the generation it was stored at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Generation of the cache when the snapshot was taken.
    pub generation: u64,
    /// The cart.
    pub cart: SparseCart,
}

/// Generation-counted cart cache.
#[derive(Debug, Default)]
pub struct CartCache {
    inner: Mutex<CartSnapshot>,
}

impl CartCache {
    /// Create a cache holding `cart` at generation 0.
    #[must_use]
    pub fn new(cart: SparseCart) -> Self {
        Self {
            inner: Mutex::new(CartSnapshot {
                generation: 0,
                cart,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CartSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current cart and generation.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.lock().clone()
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Replace the cart if the cache is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns the current generation if it differs from `expected`; the
    /// cache is left untouched.
    pub fn replace_if_current(&self, expected: u64, cart: SparseCart) -> Result<u64, u64> {
        let mut guard = self.lock();
        if guard.generation != expected {
            return Err(guard.generation);
        }
        guard.generation += 1;
        guard.cart = cart;
        Ok(guard.generation)
    }

    /// Replace the cart unconditionally, returning the new generation.
    pub fn reset(&self, cart: SparseCart) -> u64 {
        let mut guard = self.lock();
        guard.generation += 1;
        guard.cart = cart;
        guard.generation
    }
}

#[cfg(test)]
mod tests {
    use qkart_core::CartEntry;

    use super::*;

    fn cart(qty: u32) -> SparseCart {
        SparseCart::new(vec![CartEntry::new("a", qty)])
    }

    #[test]
    fn test_replace_if_current_bumps_generation() {
        let cache = CartCache::default();
        let before = cache.snapshot();

        assert_eq!(cache.generation(), 0);
        assert_eq!(cache.replace_if_current(before.generation, cart(1)), Ok(1));
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.snapshot().cart, cart(1));
    }

    #[test]
    fn test_stale_writer_is_rejected() {
        let cache = CartCache::default();
        let stale = cache.snapshot();

        cache.reset(cart(2));
        assert_eq!(cache.replace_if_current(stale.generation, cart(9)), Err(1));
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.snapshot().cart, cart(2));
    }

    #[test]
    fn test_reset_always_wins() {
        let cache = CartCache::new(cart(1));
        assert_eq!(cache.reset(SparseCart::empty()), 1);
        assert_eq!(cache.reset(cart(3)), 2);
        assert_eq!(cache.snapshot().cart, cart(3));
    }
}
