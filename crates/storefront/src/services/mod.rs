//! Business logic services for the shop.
//!
//! # Services
//!
//! - `auth` - Registration, password login, admin bootstrap
//! - `catalog` - Admin product create/update/archive
//! - `checkout` - Turning a cart into an order
//! - `images` - Product image uploads

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod images;

pub use auth::{AuthError, AuthService};
pub use catalog::{CatalogError, CatalogService, ImageUpload};
pub use checkout::{CheckoutError, CheckoutPlan, CheckoutService, PlacedOrder, plan_checkout};
pub use images::{ImageError, ImageStore};
