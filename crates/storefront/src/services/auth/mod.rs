//! Authentication service.
//!
//! Password registration and login, plus creation of admin accounts.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::LazyLock;

use sqlx::PgPool;
use tracing::{info, warn};

use corner_shop_core::{Email, Username};

use crate::db::RepositoryError;
use crate::db::users::{EMAIL_CONSTRAINT, USERNAME_CONSTRAINT, UserRepository};
use crate::models::{FieldErrors, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash verified when the email is unknown, so that path costs the same
/// Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("corner-shop-dummy-password").ok());

const USERNAME_TAKEN: &str = "Username already exists. Please choose another.";
const EMAIL_TAKEN: &str = "Email already registered. Please choose another.";

/// Raw registration form values.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` with a message per offending field,
    /// including "already exists" messages for taken usernames and emails.
    pub async fn register(&self, form: Registration<'_>) -> Result<User, AuthError> {
        let (username, email, mut errors) = validate_registration(form);

        if let Some(username) = &username
            && self.users.username_exists(username).await?
        {
            errors.add("username", USERNAME_TAKEN);
        }
        if let Some(email) = &email
            && self.users.email_exists(email).await?
        {
            errors.add("email", EMAIL_TAKEN);
        }

        match (username, email) {
            (Some(username), Some(email)) if errors.is_empty() => {
                self.create_account(&username, &email, form.password, false)
                    .await
            }
            _ => Err(AuthError::Validation(errors)),
        }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is malformed or
    /// unknown, or the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = Email::parse(email) else {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        };

        let Some((user, password_hash)) = self.users.get_credentials(&email).await? else {
            burn_verification(password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Create an account directly, skipping the confirmation field. Used for
    /// the configured admin and the CLI.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if a field is invalid or taken.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AuthError> {
        let (username, email, errors) = validate_registration(Registration {
            username,
            email,
            password,
            confirm_password: password,
        });

        match (username, email) {
            (Some(username), Some(email)) if errors.is_empty() => {
                self.create_account(&username, &email, password, is_admin)
                    .await
            }
            _ => Err(AuthError::Validation(errors)),
        }
    }

    /// Create the configured admin unless a user with that email exists.
    ///
    /// Returns the new user, or `None` when the email was already registered.
    /// An existing account is left as it is, admin or not.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the configured values are invalid.
    pub async fn ensure_admin(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let parsed = Email::parse(email).map_err(|e| {
            let mut errors = FieldErrors::default();
            errors.add("email", e.to_string());
            AuthError::Validation(errors)
        })?;

        if self.users.email_exists(&parsed).await? {
            return Ok(None);
        }

        let user = self.create_user(username, email, password, true).await?;
        info!(user_id = %user.id, username = %user.username, "Admin user created");
        Ok(Some(user))
    }

    async fn create_account(
        &self,
        username: &Username,
        email: &Email,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AuthError> {
        let password_hash = hash_password(password)?;

        self.users
            .create(username, email, &password_hash, is_admin)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                RepositoryError::Conflict(constraint) => {
                    let mut errors = FieldErrors::default();
                    if constraint == USERNAME_CONSTRAINT {
                        errors.add("username", USERNAME_TAKEN);
                    } else if constraint == EMAIL_CONSTRAINT {
                        errors.add("email", EMAIL_TAKEN);
                    } else {
                        errors.add("email", "Account already exists.");
                    }
                    AuthError::Validation(errors)
                }
                other => AuthError::Repository(other),
            })
    }
}

/// Check field formats, returning whichever fields parsed plus the messages
/// for those that did not.
fn validate_registration(
    form: Registration<'_>,
) -> (Option<Username>, Option<Email>, FieldErrors) {
    let mut errors = FieldErrors::default();

    let username = Username::parse(form.username)
        .map_err(|_| {
            errors.add(
                "username",
                format!(
                    "Username must be between {} and {} characters.",
                    Username::MIN_LENGTH,
                    Username::MAX_LENGTH
                ),
            );
        })
        .ok();

    let email = Email::parse(form.email)
        .map_err(|_| errors.add("email", "Invalid email address."))
        .ok();

    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters."),
        );
    }
    if form.password != form.confirm_password {
        errors.add("confirm_password", "Passwords must match.");
    }

    (username, email, errors)
}

/// Hash a password with Argon2id and a random salt, as a PHC string.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Run a verification that always fails, for logins with no account.
fn burn_verification(password: &str) {
    match DUMMY_HASH.as_deref() {
        Some(hash) => {
            let _ = verify_password(password, hash);
        }
        None => warn!("Dummy password hash unavailable"),
    }
}
