//! Database operations for the shop's `PostgreSQL` schema.
//!
//! # Schema: `shop`
//!
//! ## Tables
//!
//! - `app_user` - Accounts (argon2 password hash, admin flag)
//! - `product` - Catalog entries; `archived_at` marks soft-deleted rows
//! - `customer_order` - Placed orders with their final total
//! - `order_line` - Order lines with the unit price at checkout time
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p corner-shop-cli -- migrate
//! ```

pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map unique violations to [`RepositoryError::Conflict`] naming the
    /// violated constraint, everything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(db_err.constraint().unwrap_or("unique").to_owned());
        }
        Self::Database(err)
    }
}

/// A page of rows plus what is needed to render pagination links.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    /// Rows per page in admin listings.
    pub const DEFAULT_PER_PAGE: u32 = 20;

    /// Number of pages, at least one so an empty listing still renders page 1.
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let per_page = i64::from(self.per_page.max(1));
        let pages = (self.total + per_page - 1) / per_page;
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// `LIMIT`/`OFFSET` values for a 1-based page number.
#[must_use]
pub fn limit_offset(page: u32, per_page: u32) -> (i64, i64) {
    let page = page.max(1);
    let limit = i64::from(per_page.max(1));
    (limit, i64::from(page - 1) * limit)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, total: i64) -> Page<()> {
        Page {
            items: Vec::new(),
            page,
            per_page: 20,
            total,
        }
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(page(1, 0).total_pages(), 1);
        assert_eq!(page(1, 20).total_pages(), 1);
        assert_eq!(page(1, 21).total_pages(), 2);
    }

    #[test]
    fn test_prev_next() {
        let first = page(1, 45);
        assert!(!first.has_prev());
        assert!(first.has_next());

        let last = page(3, 45);
        assert!(last.has_prev());
        assert!(!last.has_next());
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(1, 20), (20, 0));
        assert_eq!(limit_offset(3, 20), (20, 40));
        assert_eq!(limit_offset(0, 20), (20, 0));
    }
}
