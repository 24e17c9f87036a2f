//! Delivery address types used at checkout.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// Errors that can occur when parsing an [`AddressText`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The input is empty or only whitespace.
    #[error("Address cannot be empty")]
    Empty,
    /// The input is too short to be a usable address.
    #[error("Address should be greater than {min} characters")]
    TooShort {
        /// Minimum number of characters.
        min: usize,
    },
    /// The input is too long.
    #[error("Address must be at most {max} characters")]
    TooLong {
        /// Maximum number of characters.
        max: usize,
    },
}

/// Free-form delivery address text entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressText(String);

impl AddressText {
    /// Minimum number of characters.
    pub const MIN_LENGTH: usize = 20;
    /// Maximum number of characters.
    pub const MAX_LENGTH: usize = 128;

    /// Parse address text, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, shorter than 20
    /// characters or longer than 128 characters.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        let len = trimmed.chars().count();
        if len < Self::MIN_LENGTH {
            return Err(AddressError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if len > Self::MAX_LENGTH {
            return Err(AddressError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddressText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Backend identifier.
    #[serde(rename = "_id")]
    pub id: AddressId,
    /// Address text.
    pub address: String,
}
