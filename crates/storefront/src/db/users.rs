//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use corner_shop_core::{Email, UserId, Username};

use super::RepositoryError;
use crate::models::User;

/// Unique constraint on `shop.app_user.username`.
pub const USERNAME_CONSTRAINT: &str = "app_user_username_key";
/// Unique constraint on `shop.app_user.email`.
pub const EMAIL_CONSTRAINT: &str = "app_user_email_key";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username,
            email,
            is_admin: row.is_admin,
            created_at: row.created_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, is_admin, created_at
            FROM shop.app_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, is_admin, created_at
            FROM shop.app_user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Get a user together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r"
            SELECT id, username, email, is_admin, created_at, password_hash
            FROM shop.app_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Whether a user already has this username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_exists(&self, username: &Username) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.app_user WHERE username = $1)",
        )
        .bind(username.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether a user already has this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.app_user WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the violated unique
    /// constraint ([`USERNAME_CONSTRAINT`] or [`EMAIL_CONSTRAINT`]).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &Username,
        email: &Email,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO shop.app_user (username, email, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, is_admin, created_at
            ",
        )
        .bind(username.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_insert)?;

        User::try_from(row)
    }

    /// Grant or revoke the admin flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this email.
    pub async fn set_admin(&self, email: &Email, is_admin: bool) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE shop.app_user
            SET is_admin = $2
            WHERE email = $1
            RETURNING id, username, email, is_admin, created_at
            ",
        )
        .bind(email.as_str())
        .bind(is_admin)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
        .and_then(User::try_from)
    }
}
