//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use corner_shop_core::{Email, UserId};

use super::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name shown in the navigation bar.
    pub username: String,
    /// User's email address.
    pub email: Email,
    /// Admin flag as of login, refreshed by admin pages. Used for navigation only.
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.as_str().to_owned(),
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";
}
