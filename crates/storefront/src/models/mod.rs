//! Domain models for the shop.
//!
//! These types are validated domain objects, separate from the `FromRow`
//! structs in [`crate::db`].

pub mod cart;
pub mod flash;
pub mod form;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartLine, CartView, CartViewLine};
pub use flash::{Flash, FlashLevel};
pub use form::FieldErrors;
pub use order::{NewOrderLine, OrderSummary};
pub use product::{Product, ProductDraft};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
