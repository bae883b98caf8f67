//! Session middleware configuration and session-held state.
//!
//! Sessions live in `PostgreSQL` (`tower_sessions.session`) and the cookie is
//! signed with a key derived from the configured session secret.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::{Key, SameSite, time::Duration};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ShopConfig;
use crate::models::{Cart, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cs_session";

/// Default expiry: seven days of inactivity.
const SESSION_EXPIRY_DAYS: i64 = 7;

/// Expiry applied at login when "remember me" is checked.
pub const REMEMBER_ME_DAYS: i64 = 30;

/// Signed session layer type used by the application.
pub type ShopSessionLayer<S> = SessionManagerLayer<S, SignedCookie>;

/// Create the session layer with the `PostgreSQL` store.
///
/// The session table is created by `PostgresStore::migrate`, run from
/// `cs-cli migrate`.
#[must_use]
pub fn create_session_layer(pool: &PgPool, config: &ShopConfig) -> ShopSessionLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());
    session_layer(store, &config.session_secret, config.is_secure())
}

/// Build a signed session layer over any store.
#[must_use]
pub fn session_layer<S: SessionStore>(
    store: S,
    secret: &SecretString,
    secure: bool,
) -> ShopSessionLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(secret))
}

/// Derive a 64-byte cookie signing key from the session secret.
fn signing_key(secret: &SecretString) -> Key {
    let digest = Sha512::digest(secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// Session expiry for a fresh login.
#[must_use]
pub fn login_expiry(remember: bool) -> Expiry {
    if remember {
        Expiry::OnInactivity(Duration::days(REMEMBER_ME_DAYS))
    } else {
        Expiry::OnSessionEnd
    }
}

/// Read the cart from the session, empty if none was stored.
///
/// # Errors
///
/// Returns an error if the session store fails or the stored cart cannot be
/// deserialized.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session.get::<Cart>(session_keys::CART).await?.unwrap_or_default())
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}
