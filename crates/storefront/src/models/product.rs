//! Product domain types.

use chrono::{DateTime, Utc};

use corner_shop_core::{Money, ProductId};

use super::form::FieldErrors;

/// A catalog entry (domain type).
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    /// Units on hand. Never negative; decremented only by a committed order.
    pub stock: u32,
    /// Filename under the images directory.
    pub image_file: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the product is deleted from the catalog.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the product is still offered in the storefront.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.archived_at.is_none()
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Public URL of the product image.
    #[must_use]
    pub fn image_url(&self) -> String {
        format!("/static/images/{}", self.image_file)
    }
}

/// Validated editable product fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
}

impl ProductDraft {
    pub const NAME_MIN: usize = 2;
    pub const NAME_MAX: usize = 150;

    /// Validate raw form values, collecting one message per invalid field.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] when any field is invalid.
    pub fn parse(
        name: &str,
        description: &str,
        price: &str,
        stock: &str,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = name.trim();
        let name_len = name.chars().count();
        if !(Self::NAME_MIN..=Self::NAME_MAX).contains(&name_len) {
            errors.add(
                "name",
                format!(
                    "Name must be between {} and {} characters.",
                    Self::NAME_MIN,
                    Self::NAME_MAX
                ),
            );
        }

        let description = description.trim();
        if description.is_empty() {
            errors.add("description", "Description is required.");
        }

        let price = Money::parse(price)
            .map_err(|e| errors.add("price", format!("Price {e}.")))
            .ok();

        let stock = match stock.trim().parse::<i64>() {
            Ok(n) if n < 0 => {
                errors.add("stock", "Stock cannot be negative.");
                None
            }
            Ok(n) => u32::try_from(n)
                .ok()
                .filter(|n| i32::try_from(*n).is_ok())
                .or_else(|| {
                    errors.add("stock", "Stock is too large.");
                    None
                }),
            Err(_) => {
                errors.add("stock", "Stock must be a whole number.");
                None
            }
        };

        match (price, stock) {
            (Some(price), Some(stock)) if errors.is_empty() => Ok(Self {
                name: name.to_owned(),
                description: description.to_owned(),
                price,
                stock,
            }),
            _ => Err(errors),
        }
    }
}
