//! Authentication route handlers.
//!
//! Handles login, registration, and logout with email and password.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    OptionalAuth, PageContext, clear_current_user, login_expiry, push_flash, set_current_user,
};
use crate::models::{CurrentUser, FieldErrors, Flash};
use crate::services::{AuthError, AuthService, auth::Registration};
use crate::state::AppState;

const LOGIN_FAILED: &str = "Login Unsuccessful. Please check email and password.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Checkbox; present (as "on") only when ticked.
    pub remember: Option<String>,
    /// Page to return to after login.
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// `?next=` query on the login page.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub remember: bool,
    pub next: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub username: String,
    pub email: String,
    pub errors: FieldErrors,
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\"))
}

fn into_app_error(err: AuthError) -> AppError {
    match err {
        AuthError::Repository(e) => AppError::Database(e),
        other => AppError::Internal(other.to_string()),
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    page: PageContext,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        page,
        email: String::new(),
        remember: false,
        next: query.next,
    }
    .into_response()
}

/// Handle login form submission.
///
/// On success the session ID is rotated and the session lifetime set from the
/// "remember me" box. A failed login re-renders the form with the email kept.
#[instrument(skip_all)]
pub async fn login(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            warn!("Login failed");
            page.flashes.push(Flash::danger(LOGIN_FAILED));
            return Ok(LoginTemplate {
                page,
                email: form.email,
                remember: form.remember.is_some(),
                next: form.next,
            }
            .into_response());
        }
        Err(e) => return Err(into_app_error(e)),
    };

    let remember = form.remember.is_some();
    session.cycle_id().await?;
    session.set_expiry(Some(login_expiry(remember)));
    set_current_user(&session, &CurrentUser::from(&user)).await?;
    push_flash(&session, Flash::success("Logged in successfully!")).await?;

    set_sentry_user(&user.id, user.username.as_str());
    add_breadcrumb("auth", "User logged in", &[("remember", if remember { "yes" } else { "no" })]);
    info!(user_id = %user.id, "User logged in");

    let target = safe_next(form.next.as_deref()).unwrap_or("/");
    Ok(Redirect::to(target).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(user): OptionalAuth, page: PageContext) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    RegisterTemplate {
        page,
        username: String::new(),
        email: String::new(),
        errors: FieldErrors::default(),
    }
    .into_response()
}

/// Handle registration form submission.
///
/// Invalid or taken fields re-render the form with a message per field. A new
/// account is not logged in; the user is sent to the login page.
#[instrument(skip_all)]
pub async fn register(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let result = AuthService::new(state.pool())
        .register(Registration {
            username: &form.username,
            email: &form.email,
            password: &form.password,
            confirm_password: &form.confirm_password,
        })
        .await;

    match result {
        Ok(user) => {
            info!(user_id = %user.id, "User registered");
            push_flash(
                &session,
                Flash::success("Your account has been created! You can now log in."),
            )
            .await?;
            Ok(Redirect::to("/login").into_response())
        }
        Err(AuthError::Validation(errors)) => Ok(RegisterTemplate {
            page,
            username: form.username,
            email: form.email,
            errors,
        }
        .into_response()),
        Err(e) => Err(into_app_error(e)),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Log out, keeping the rest of the session (the cart survives).
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
