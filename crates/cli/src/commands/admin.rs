//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account
//! cs-cli admin create -e admin@example.com -u admin -p 'long-password'
//!
//! # Promote an existing customer, or demote with --revoke
//! cs-cli admin promote -e someone@example.com
//! ```
//!
//! Admin pages re-read the flag on every request, so the change applies to
//! sessions that are already logged in.

use thiserror::Error;

use corner_shop_core::Email;
use corner_shop_storefront::db::{RepositoryError, UserRepository};
use corner_shop_storefront::services::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account has this email.
    #[error("No user with email: {0}")]
    UnknownUser(String),

    #[error("Could not create account: {0}")]
    Auth(#[from] AuthError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a new admin account.
///
/// Returns the ID of the created user.
pub async fn create_user(email: &str, username: &str, password: &str) -> Result<i32, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating admin user: {} ({})", username, email);

    let user = AuthService::new(&pool)
        .create_user(username, email, password, true)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id.as_i32())
}

/// Set or clear the admin flag on an existing account.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<(), AdminError> {
    let parsed = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_admin(&parsed, is_admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UnknownUser(email.to_owned()),
            other => AdminError::Repository(other),
        })?;

    if is_admin {
        tracing::info!("{} is now an admin", user.username);
    } else {
        tracing::info!("{} is no longer an admin", user.username);
    }

    Ok(())
}
