//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ShopConfig;
use crate::services::ImageStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ShopConfig,
    pool: PgPool,
    images: ImageStore,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ShopConfig, pool: PgPool) -> Self {
        let images = ImageStore::new(config.images_dir.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                images,
            }),
        }
    }

    /// Get a reference to the shop configuration.
    #[must_use]
    pub fn config(&self) -> &ShopConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the product image store.
    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }
}
