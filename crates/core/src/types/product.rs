//! Catalog product types.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Errors that can occur when constructing a [`Rating`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingError {
    /// Ratings are whole stars between 0 and 5.
    #[error("rating must be between 0 and {max} (got {got})")]
    OutOfRange {
        /// Value received.
        got: u8,
        /// Maximum allowed rating.
        max: u8,
    },
}

/// Aggregate product rating, in whole stars out of five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Highest possible rating.
    pub const MAX: u8 = 5;

    /// Create a new rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::OutOfRange`] if `stars` is greater than 5.
    pub const fn new(stars: u8) -> Result<Self, RatingError> {
        if stars > Self::MAX {
            return Err(RatingError::OutOfRange {
                got: stars,
                max: Self::MAX,
            });
        }
        Ok(Self(stars))
    }

    /// Number of stars.
    #[must_use]
    pub const fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Self::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// A product available to buy.
///
/// Sourced from the catalog endpoints and never modified by the client.
/// Field names follow the backend's JSON (`_id`, `image`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Name or title of the product.
    pub name: String,
    /// Category the product belongs to.
    pub category: String,
    /// Price of a single unit.
    pub cost: Price,
    /// Aggregate rating.
    pub rating: Rating,
    /// URL of the product image.
    #[serde(rename = "image")]
    pub image_url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_from_backend_json() {
        let json = r#"{
            "name": "iPhone XR",
            "category": "Phones",
            "cost": 100,
            "rating": 4,
            "image": "https://i.imgur.com/lulqWzW.jpg",
            "_id": "v4sLtEcMpzabRyfx"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "v4sLtEcMpzabRyfx");
        assert_eq!(product.cost, Price::from_units(100));
        assert_eq!(product.rating.stars(), 4);
        assert_eq!(product.image_url, "https://i.imgur.com/lulqWzW.jpg");
    }

    #[test]
    fn test_rating_out_of_range() {
        assert_eq!(
            Rating::new(6),
            Err(RatingError::OutOfRange { got: 6, max: 5 })
        );
        let json = r#"{"name":"x","category":"y","cost":1,"rating":9,"image":"","_id":"a"}"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::new(3).unwrap().to_string(), "3/5");
    }
}
