//! Order domain types.

use chrono::{DateTime, Utc};

use corner_shop_core::{Money, MoneyError, OrderId, ProductId, UserId};

/// An order line about to be written, priced at checkout time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl NewOrderLine {
    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] if the subtotal cannot be stored.
    pub fn subtotal(&self) -> Result<Money, MoneyError> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// A placed order as listed on the admin dashboard.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    /// Owner's username at listing time.
    pub username: String,
    /// Number of order lines.
    pub line_count: i64,
    /// Total fixed when the order was placed.
    pub total: Money,
    pub created_at: DateTime<Utc>,
}
