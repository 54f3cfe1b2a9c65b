//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::{CartStore, KvError, KvStore};
use crate::catalog::{ApiError, CatalogClient};
use crate::config::{CartStoreLocation, StorefrontConfig};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("catalog client: {0}")]
    Catalog(#[from] ApiError),
    #[error("cart store: {0}")]
    CartStore(#[from] KvError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend client, cart store, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogClient,
    carts: CartStore,
}

impl AppState {
    /// Create a new application state, opening the configured cart store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the cart file
    /// exists but cannot be read.
    pub async fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let catalog = CatalogClient::new(&config.api)?;
        let kv = match &config.cart_store {
            CartStoreLocation::File(path) => KvStore::open(path).await?,
            CartStoreLocation::Memory => KvStore::in_memory(),
        };

        Ok(Self::from_parts(config, catalog, CartStore::new(kv)))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn from_parts(config: StorefrontConfig, catalog: CatalogClient, carts: CartStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                carts,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the products backend client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }
}
