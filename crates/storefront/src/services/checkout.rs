//! Checkout: turning the session cart into an order.
//!
//! All writes happen in one transaction. The cart's products are locked
//! (`FOR UPDATE`) and the whole order is planned in memory before anything is
//! written, so a single unavailable line rejects the checkout with no order
//! row and no stock change. Concurrent checkouts of the same product
//! serialize on the row lock; the second one re-reads the decremented stock.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use corner_shop_core::{Money, OrderId, ProductId, UserId};

use crate::db::{RepositoryError, orders, products};
use crate::models::{Cart, NewOrderLine, Product};

/// Reasons a checkout is refused.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a product that no longer exists or is archived.
    #[error("product {0} is no longer available")]
    ProductUnavailable(ProductId),

    #[error("product {product_id} has {available} in stock but {requested} were requested")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The order total does not fit a stored amount.
    #[error("order total is too large")]
    TotalTooLarge,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// The lines and total of an order that can be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub lines: Vec<NewOrderLine>,
    pub total: Money,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Copy)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: Money,
}

/// Price every cart line against a catalog snapshot.
///
/// Every line is checked before a plan is returned; the first line that
/// cannot be filled rejects the whole cart.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart`, `CheckoutError::ProductUnavailable`,
/// `CheckoutError::OutOfStock`, or `CheckoutError::TotalTooLarge`.
pub fn plan_checkout(
    cart: &Cart,
    catalog: &HashMap<ProductId, Product>,
) -> Result<CheckoutPlan, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let lines = cart
        .lines()
        .iter()
        .map(|line| {
            let product = catalog
                .get(&line.product_id)
                .filter(|p| p.is_active())
                .ok_or(CheckoutError::ProductUnavailable(line.product_id))?;
            if product.stock < line.quantity {
                return Err(CheckoutError::OutOfStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
            Ok(NewOrderLine {
                product_id: product.id,
                quantity: line.quantity,
                unit_price: product.price,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let subtotals = lines
        .iter()
        .map(NewOrderLine::subtotal)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CheckoutError::TotalTooLarge)?;
    let total = Money::checked_sum(subtotals).map_err(|_| CheckoutError::TotalTooLarge)?;
    Ok(CheckoutPlan { lines, total })
}

/// Places orders.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an order from `cart` for `user_id`, decrementing stock.
    ///
    /// The caller clears the session cart only after this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`plan_checkout`], or `CheckoutError::Repository`
    /// if the transaction fails. Nothing is written in either case.
    #[instrument(skip(self, cart), fields(lines = cart.lines().len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        cart: &Cart,
    ) -> Result<PlacedOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut tx = self.pool.begin().await?;

        let locked = products::lock_active_by_ids(&mut tx, &cart.product_ids()).await?;
        let catalog: HashMap<ProductId, Product> =
            locked.into_iter().map(|p| (p.id, p)).collect();

        // Dropping `tx` on an early return rolls the transaction back
        let plan = plan_checkout(cart, &catalog).inspect_err(|e| {
            warn!(error = %e, "Checkout rejected");
        })?;

        let order_id = orders::insert_order(&mut tx, user_id, plan.total).await?;
        for line in &plan.lines {
            orders::insert_line(&mut tx, order_id, line).await?;
            products::decrement_stock(&mut tx, line.product_id, line.quantity).await?;
        }

        tx.commit().await?;

        info!(order_id = %order_id, total = %plan.total, "Order placed");
        Ok(PlacedOrder {
            order_id,
            total: plan.total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i32, price: &str, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: "desc".to_owned(),
            price: Money::parse(price).unwrap(),
            stock,
            image_file: "default.svg".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            archived_at: None,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<ProductId, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_plan_totals_price_times_quantity() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2);
        cart.add(ProductId::new(2), 3);
        let catalog = catalog(vec![product(1, "10.00", 5), product(2, "2.50", 3)]);

        let plan = plan_checkout(&cart, &catalog).unwrap();
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].unit_price, Money::parse("10.00").unwrap());
        assert_eq!(plan.lines[1].quantity, 3);
        assert_eq!(plan.total, Money::parse("27.50").unwrap());
    }

    #[test]
    fn test_any_short_line_rejects_whole_cart() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2);
        cart.add(ProductId::new(2), 1);
        let catalog = catalog(vec![product(1, "10.00", 5), product(2, "5.00", 0)]);

        let err = plan_checkout(&cart, &catalog).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::OutOfStock {
                product_id,
                requested: 1,
                available: 0,
            } if product_id == ProductId::new(2)
        ));
    }

    #[test]
    fn test_exact_stock_is_enough() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 5);
        let catalog = catalog(vec![product(1, "1.00", 5)]);
        assert!(plan_checkout(&cart, &catalog).is_ok());
    }

    #[test]
    fn test_missing_or_archived_product_is_unavailable() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(3), 1);
        assert!(matches!(
            plan_checkout(&cart, &HashMap::new()),
            Err(CheckoutError::ProductUnavailable(id)) if id == ProductId::new(3)
        ));

        let mut archived = product(3, "1.00", 10);
        archived.archived_at = Some(Utc::now());
        assert!(matches!(
            plan_checkout(&cart, &catalog(vec![archived])),
            Err(CheckoutError::ProductUnavailable(_))
        ));
    }

    #[test]
    fn test_total_over_storage_limit_is_rejected() {
        let mut single = Cart::default();
        single.add(ProductId::new(1), 20);
        let expensive = catalog(vec![
            product(1, "999999999.00", 100),
            product(2, "999999999.00", 100),
        ]);
        assert!(matches!(
            plan_checkout(&single, &expensive),
            Err(CheckoutError::TotalTooLarge)
        ));

        // Each line fits on its own but the sum does not
        let mut split = Cart::default();
        split.add(ProductId::new(1), 6);
        split.add(ProductId::new(2), 6);
        assert!(matches!(
            plan_checkout(&split, &expensive),
            Err(CheckoutError::TotalTooLarge)
        ));
    }

    #[test]
    fn test_empty_cart() {
        assert!(matches!(
            plan_checkout(&Cart::default(), &HashMap::new()),
            Err(CheckoutError::EmptyCart)
        ));
    }
}
