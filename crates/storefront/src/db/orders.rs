//! Order repository for database operations.
//!
//! Orders are written only by checkout, inside its transaction, through the
//! free functions taking a `PgConnection`. The repository type serves reads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use corner_shop_core::{Money, OrderId, UserId};

use super::products::stock_param;
use super::{Page, RepositoryError, limit_offset};
use crate::models::{NewOrderLine, OrderSummary};

#[derive(sqlx::FromRow)]
struct OrderSummaryRow {
    id: i32,
    user_id: i32,
    username: String,
    line_count: i64,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderSummaryRow) -> Result<Self, Self::Error> {
        let total = Money::new(row.total).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid total for order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            username: row.username,
            line_count: row.line_count,
            total,
            created_at: row.created_at,
        })
    }
}

/// Repository for reading placed orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List orders, most recent first, with owner and line count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let (limit, offset) = limit_offset(page, per_page);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.customer_order")
            .fetch_one(self.pool)
            .await?;

        let rows = sqlx::query_as::<_, OrderSummaryRow>(
            r"
            SELECT o.id, o.user_id, u.username, o.total, o.created_at,
                   (SELECT COUNT(*) FROM shop.order_line l WHERE l.order_id = o.id) AS line_count
            FROM shop.customer_order o
            JOIN shop.app_user u ON u.id = o.user_id
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(OrderSummary::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: page.max(1),
            per_page,
            total,
        })
    }
}

/// Insert an order header with its final total.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    user_id: UserId,
    total: Money,
) -> Result<OrderId, RepositoryError> {
    let id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO shop.customer_order (user_id, total)
        VALUES ($1, $2)
        RETURNING id
        ",
    )
    .bind(user_id)
    .bind(total)
    .fetch_one(conn)
    .await?;

    Ok(OrderId::new(id))
}

/// Insert one order line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &NewOrderLine,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shop.order_line (order_id, product_id, quantity, unit_price)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(stock_param(line.quantity)?)
    .bind(line.unit_price)
    .execute(conn)
    .await?;

    Ok(())
}
