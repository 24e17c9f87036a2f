//! QKart storefront client library.
//!
//! This crate is the logic core behind any QKart view layer (the `qkart`
//! CLI, or a GUI). It talks to the QKart REST backend and owns everything
//! that is not rendering:
//!
//! - [`cart::merge`] - joins the sparse server cart with the catalog and
//!   computes totals
//! - [`cart::CartMutationCoordinator`] - quantity changes against the
//!   backend, one in flight at a time
//! - [`search::SearchDebouncer`] - trailing-edge debounced search
//! - [`session::Session`] - credential, wallet and cart cache with an
//!   explicit login/logout lifecycle
//! - [`storefront::Storefront`] - facade tying the above together
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use qkart_client::{ClientConfig, HttpBackend, FileStore, Storefront};
//!
//! let config = ClientConfig::from_env()?;
//! let api = HttpBackend::new(&config)?;
//! let store = Arc::new(FileStore::open(&config.state_path)?);
//! let storefront = Storefront::new(config, api, store)?;
//!
//! storefront.load_catalog().await?;
//! storefront.login("criodo", "learnbydoing").await?;
//! storefront.add_to_cart(&"BW0jAAeDJmlZCF8i".into(), 1).await?;
//! println!("{}", storefront.cart_view().totals.total_value);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod search;
pub mod session;
pub mod storage;
pub mod storefront;

pub use api::{AddressApi, ApiError, AuthApi, CartApi, CatalogApi, HttpBackend};
pub use cart::{CartMutationCoordinator, CartView, MutationOptions, MutationState};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use search::{ScheduledTask, SearchDebouncer, SearchResults};
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use storefront::{Backend, Storefront};
