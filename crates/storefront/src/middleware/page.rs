//! Per-request layout data shared by every rendered page.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::warn;

use super::flash::take_flashes;
use super::session::load_cart;
use crate::models::{CurrentUser, Flash, session_keys};

/// Navigation and notification data for the base layout.
///
/// Extracting it consumes the pending flash messages, so extract it only in
/// handlers that render a page.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    /// Units in the cart, shown in the navigation bar.
    pub cart_count: u32,
}

impl PageContext {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_user.as_ref().is_some_and(|u| u.is_admin)
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let current_user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();

        let flashes = take_flashes(session).await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read flash messages");
            Vec::new()
        });

        let cart_count = load_cart(session).await.map_or_else(
            |e| {
                warn!(error = %e, "Failed to read cart");
                0
            },
            |cart| cart.item_count(),
        );

        Ok(Self {
            current_user,
            flashes,
            cart_count,
        })
    }
}
