//! Product repository for database operations.
//!
//! Deleted products are archived (`archived_at` set) rather than removed so
//! historical order lines keep a valid reference. Every read here only sees
//! active products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use corner_shop_core::{Money, ProductId};

use super::{Page, RepositoryError, limit_offset};
use crate::models::{Product, ProductDraft};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, stock, image_file, created_at, updated_at, archived_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    image_file: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Money::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative stock for product {}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price,
            stock,
            image_file: row.image_file,
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived_at: row.archived_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Convert a stock count for an `INTEGER` column.
pub(crate) fn stock_param(stock: u32) -> Result<i32, RepositoryError> {
    i32::try_from(stock)
        .map_err(|_| RepositoryError::DataCorruption(format!("stock {stock} out of range")))
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Product>, RepositoryError> {
        let (limit, offset) = limit_offset(page, per_page);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.product WHERE archived_at IS NULL")
                .fetch_one(self.pool)
                .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM shop.product
            WHERE archived_at IS NULL
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page {
            items: into_products(rows)?,
            page: page.max(1),
            per_page,
            total,
        })
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1 AND archived_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    /// Get the active products among `ids`, in id order. Missing or archived
    /// ids are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM shop.product
            WHERE id = ANY($1) AND archived_at IS NULL
            ORDER BY id
            "
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        into_products(rows)
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        draft: &ProductDraft,
        image_file: &str,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO shop.product (name, description, price, stock, image_file)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(stock_param(draft.stock)?)
        .bind(image_file)
        .fetch_one(self.pool)
        .await?;

        Product::try_from(row)
    }

    /// Overwrite the editable fields of an active product. The image is
    /// replaced only when `image_file` is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is absent or archived.
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
        image_file: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE shop.product
            SET name = $2,
                description = $3,
                price = $4,
                stock = $5,
                image_file = COALESCE($6, image_file),
                updated_at = NOW()
            WHERE id = $1 AND archived_at IS NULL
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(stock_param(draft.stock)?)
        .bind(image_file)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
        .and_then(Product::try_from)
    }

    /// Archive a product so it leaves the storefront.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is absent or
    /// already archived.
    pub async fn archive(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET archived_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND archived_at IS NULL
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Whether an active product already has this exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_name_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.product WHERE name = $1 AND archived_at IS NULL)",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}

/// Lock the active products among `ids` for the rest of the transaction.
///
/// Rows are locked in id order so concurrent checkouts over overlapping
/// carts cannot deadlock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_active_by_ids(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        r"
        SELECT {PRODUCT_COLUMNS}
        FROM shop.product
        WHERE id = ANY($1) AND archived_at IS NULL
        ORDER BY id
        FOR UPDATE
        "
    ))
    .bind(raw)
    .fetch_all(conn)
    .await?;

    into_products(rows)
}

/// Decrement stock, refusing to go below zero.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the product lacks `quantity` units.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: u32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE shop.product
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(id)
    .bind(stock_param(quantity)?)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "insufficient stock for product {id}"
        )));
    }
    Ok(())
}
