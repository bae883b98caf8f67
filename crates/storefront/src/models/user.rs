//! User domain types.

use chrono::{DateTime, Utc};

use corner_shop_core::{Email, UserId, Username};

/// A registered account (domain type).
///
/// The password hash never leaves [`crate::db::users`] except through
/// [`crate::db::UserRepository::get_credentials`].
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name, unique across users.
    pub username: Username,
    /// Login email, unique across users.
    pub email: Email,
    /// Whether the user may manage the catalog.
    pub is_admin: bool,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}
