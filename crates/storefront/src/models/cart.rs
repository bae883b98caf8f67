//! Session-held shopping cart.
//!
//! The cart maps product ids to quantities in insertion order. It lives only
//! in the session; nothing about it is persisted to the catalog until
//! checkout turns it into an order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use corner_shop_core::{Money, ProductId};

use super::Product;

/// One entry in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
}

/// Product id to quantity mapping stored under the `cart` session key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Add `quantity` units of a product, returning the new quantity.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> u32 {
        let quantity = quantity.max(1);
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
            return line.quantity;
        }
        self.lines.push(CartLine {
            product_id,
            quantity,
        });
        quantity
    }

    /// Remove a product. Returns whether it was present; absent ids are a no-op.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines, shown in the navigation bar.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Product ids in cart order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Drop lines whose product is missing from `catalog` (deleted or
    /// archived since it was added). Returns how many lines were dropped.
    pub fn retain_available(&mut self, catalog: &HashMap<ProductId, Product>) -> usize {
        let before = self.lines.len();
        self.lines
            .retain(|l| catalog.get(&l.product_id).is_some_and(Product::is_active));
        before - self.lines.len()
    }

    /// Resolved lines plus their total, skipping products missing from
    /// `catalog`.
    #[must_use]
    pub fn view<'a>(&'a self, catalog: &'a HashMap<ProductId, Product>) -> CartView<'a> {
        let lines: Vec<_> = self
            .lines
            .iter()
            .filter_map(|line| {
                catalog.get(&line.product_id).map(|product| CartViewLine {
                    product,
                    quantity: line.quantity,
                    subtotal: product.price.checked_times(line.quantity).ok(),
                })
            })
            .collect();
        let total = lines
            .iter()
            .map(|l| l.subtotal)
            .collect::<Option<Vec<_>>>()
            .and_then(|subtotals| Money::checked_sum(subtotals).ok());
        CartView { lines, total }
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone)]
pub struct CartViewLine<'a> {
    pub product: &'a Product,
    pub quantity: u32,
    /// `None` when the amount is too large to be ordered.
    pub subtotal: Option<Money>,
}

/// The cart as displayed: resolvable lines and their total.
#[derive(Debug, Clone)]
pub struct CartView<'a> {
    pub lines: Vec<CartViewLine<'a>>,
    /// `None` when any subtotal, or their sum, is too large to be ordered.
    pub total: Option<Money>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(id: i32, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: "desc".to_owned(),
            price: Money::parse(price).unwrap(),
            stock: 10,
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
    fn test_add_twice_accumulates() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 1);
        assert_eq!(cart.add(ProductId::new(1), 1), 2);

        let catalog = catalog(vec![product(1, "10.00")]);
        let view = cart.view(&catalog);
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 2);
        assert_eq!(view.lines[0].subtotal, Some(Money::parse("20.00").unwrap()));
        assert_eq!(view.total, Some(Money::parse("20.00").unwrap()));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 1);
        let before = cart.clone();
        assert!(!cart.remove(ProductId::new(99)));
        assert_eq!(cart, before);
        assert!(cart.remove(ProductId::new(1)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_missing_products_are_skipped() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2);
        cart.add(ProductId::new(2), 1);
        cart.add(ProductId::new(3), 3);

        let catalog = catalog(vec![product(1, "1.50"), product(3, "2.00")]);
        let view = cart.view(&catalog);
        let ids: Vec<_> = view.lines.iter().map(|l| l.product.id.as_i32()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(view.total, Some(Money::parse("9.00").unwrap()));
    }

    #[test]
    fn test_retain_available_drops_gone_products() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 1);
        cart.add(ProductId::new(2), 1);
        cart.add(ProductId::new(3), 2);

        let mut archived = product(3, "1.00");
        archived.archived_at = Some(Utc::now());
        let catalog = catalog(vec![product(1, "1.00"), archived]);

        assert_eq!(cart.retain_available(&catalog), 2);
        assert_eq!(cart.product_ids(), vec![ProductId::new(1)]);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.retain_available(&catalog), 0);
    }

    #[test]
    fn test_oversized_total_is_not_displayed_as_a_number() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 20);
        cart.add(ProductId::new(2), 1);
        let catalog = catalog(vec![product(1, "999999999.00"), product(2, "1.00")]);

        let view = cart.view(&catalog);
        assert_eq!(view.lines[0].subtotal, None);
        assert_eq!(view.lines[1].subtotal, Some(Money::parse("1.00").unwrap()));
        assert_eq!(view.total, None);
    }

    #[test]
    fn test_insertion_order_and_item_count() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(5), 1);
        cart.add(ProductId::new(2), 4);
        cart.add(ProductId::new(5), 1);
        assert_eq!(cart.product_ids(), vec![ProductId::new(5), ProductId::new(2)]);
        assert_eq!(cart.item_count(), 6);
        assert_eq!(cart.lines()[1].quantity, 4);
    }

    #[test]
    fn test_session_serialization_shape() {
        let mut cart = Cart::default();
        cart.add(ProductId::new(7), 2);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"lines": [{"product_id": 7, "quantity": 2}]})
        );
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
