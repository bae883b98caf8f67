//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user, or an admin, in route
//! handlers. Rejections are redirects with a flash message; handlers behind
//! them never run.
//!
//! The session holds a snapshot of the user taken at login. `RequireAdmin`
//! does not trust its admin flag: it re-reads the account on every request,
//! so a revoked admin loses access immediately.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{info, warn};

use super::flash::push_flash;
use crate::db::{RepositoryError, UserRepository};
use crate::error::AppError;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

const LOGIN_REQUIRED: &str = "Please log in to access this page.";
const ACCESS_DENIED: &str = "Access denied.";

/// Extractor that requires a logged-in user.
///
/// Anonymous visitors are redirected to `/login?next=<path>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a logged-in admin.
///
/// The admin flag is read from the database, not the session. Place it first
/// in the handler's arguments so no other extractor runs for a rejected
/// request; anonymous visitors are rejected without a database query.
pub struct RequireAdmin(pub CurrentUser);

/// Error returned when an auth extractor rejects a request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not logged in: go to the login page, then back to `next`.
    RedirectToLogin { next: String },
    /// Logged in without admin rights.
    Forbidden,
    /// No session layer is installed.
    MissingSession,
    /// The account could not be re-read.
    Database(RepositoryError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => Redirect::to(&login_url(&next)).into_response(),
            Self::Forbidden => Redirect::to("/").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Self::Database(e) => AppError::Database(e).into_response(),
        }
    }
}

/// The login URL that returns to `next` afterwards.
#[must_use]
pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

/// Path and query of the request, used as the post-login target.
fn requested_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned())
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

async fn flash_or_warn(session: &Session, flash: Flash) {
    if let Err(e) = push_flash(session, flash).await {
        warn!(error = %e, "Failed to queue flash message");
    }
}

async fn require_user(parts: &Parts) -> Result<(Session, CurrentUser), AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::MissingSession)?;

    match current_user(&session).await {
        Some(user) => Ok((session, user)),
        None => {
            flash_or_warn(&session, Flash::info(LOGIN_REQUIRED)).await;
            Err(AuthRejection::RedirectToLogin {
                next: requested_path(parts),
            })
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let (_, user) = require_user(parts).await?;
        Ok(Self(user))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let (session, snapshot) = require_user(parts).await?;
        let state = AppState::from_ref(state);

        let stored = UserRepository::new(state.pool())
            .get_by_id(snapshot.id)
            .await
            .map_err(AuthRejection::Database)?;

        let Some(stored) = stored else {
            info!(user_id = %snapshot.id, "Session user no longer exists");
            if let Err(e) = clear_current_user(&session).await {
                warn!(error = %e, "Failed to clear stale session user");
            }
            flash_or_warn(&session, Flash::info(LOGIN_REQUIRED)).await;
            return Err(AuthRejection::RedirectToLogin {
                next: requested_path(parts),
            });
        };

        let current = CurrentUser::from(&stored);
        if current.is_admin != snapshot.is_admin {
            info!(user_id = %current.id, is_admin = current.is_admin, "Refreshing session admin flag");
            if let Err(e) = set_current_user(&session, &current).await {
                warn!(error = %e, "Failed to refresh session user");
            }
        }

        if !current.is_admin {
            warn!(user_id = %current.id, path = %parts.uri.path(), "Non-admin denied admin access");
            flash_or_warn(&session, Flash::danger(ACCESS_DENIED)).await;
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(current))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// The rest of the session, including the cart, is kept.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
