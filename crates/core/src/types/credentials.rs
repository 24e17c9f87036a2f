//! Login and registration form input.
//!
//! Validation runs on the client so that obviously bad input never reaches
//! the backend. Error messages are user-facing and shown verbatim.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Minimum length of usernames and passwords at registration.
pub const MIN_CREDENTIAL_LENGTH: usize = 6;

/// Errors that can occur when validating credential input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// A field was left empty.
    #[error("{field} is a required field")]
    Required {
        /// Display name of the field.
        field: &'static str,
    },
    /// A field is shorter than allowed.
    #[error("{field} must be at least {min} characters")]
    TooShort {
        /// Display name of the field.
        field: &'static str,
        /// Minimum number of characters.
        min: usize,
    },
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// A username.
///
/// ## Constraints
///
/// - Must not be empty
/// - At registration, must be at least 6 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Parse a username for registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or shorter than 6 characters.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        require("Username", s)?;
        min_length("Username", s)?;
        Ok(Self(s.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A password.
///
/// Held as a [`SecretString`] so it never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct Password(SecretString);

impl Password {
    /// Parse a password for registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or shorter than 6 characters.
    pub fn parse(s: &str) -> Result<Self, CredentialError> {
        require("Password", s)?;
        min_length("Password", s)?;
        Ok(Self(SecretString::from(s.to_owned())))
    }

    /// Expose the password for sending to the backend.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// Validated login form.
///
/// Login only checks that both fields are filled in; length rules are
/// enforced at registration.
#[derive(Debug, Clone)]
pub struct LoginForm {
    /// Username to log in as.
    pub username: Username,
    /// Account password.
    pub password: Password,
}

impl LoginForm {
    /// Validate login input.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Required`] for the first empty field.
    pub fn new(username: &str, password: &str) -> Result<Self, CredentialError> {
        require("Username", username)?;
        require("Password", password)?;
        Ok(Self {
            username: Username(username.to_owned()),
            password: Password(SecretString::from(password.to_owned())),
        })
    }
}

/// Validated registration form.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Requested username.
    pub username: Username,
    /// Requested password.
    pub password: Password,
}

impl Registration {
    /// Validate registration input.
    ///
    /// Fields are checked in form order and the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is empty, too short, or the confirmation
    /// does not match the password.
    pub fn new(username: &str, password: &str, confirm: &str) -> Result<Self, CredentialError> {
        let username = Username::parse(username)?;
        let password = Password::parse(password)?;
        if password.expose() != confirm {
            return Err(CredentialError::PasswordMismatch);
        }
        Ok(Self { username, password })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), CredentialError> {
    if value.is_empty() {
        return Err(CredentialError::Required { field });
    }
    Ok(())
}

fn min_length(field: &'static str, value: &str) -> Result<(), CredentialError> {
    if value.chars().count() < MIN_CREDENTIAL_LENGTH {
        return Err(CredentialError::TooShort {
            field,
            min: MIN_CREDENTIAL_LENGTH,
        });
    }
    Ok(())
}
