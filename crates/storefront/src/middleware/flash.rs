//! Flash messages queued in the session for the next rendered page.

use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Queue a flash message.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn push_flash(session: &Session, flash: Flash) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<Flash> = session.get(session_keys::FLASH).await?.unwrap_or_default();
    pending.push(flash);
    session.insert(session_keys::FLASH, pending).await
}

/// Remove and return all queued flash messages.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn take_flashes(session: &Session) -> Result<Vec<Flash>, tower_sessions::session::Error> {
    Ok(session
        .remove::<Vec<Flash>>(session_keys::FLASH)
        .await?
        .unwrap_or_default())
}
