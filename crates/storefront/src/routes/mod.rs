//! HTTP route handlers for the shop.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Product listing
//! GET  /product/{id}               - Product detail
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database)
//!
//! # Cart (session)
//! POST /add_to_cart/{id}           - Add one unit
//! GET  /cart                       - Cart page
//! POST /remove_from_cart/{id}      - Remove a line
//! GET  /checkout                   - Order review (requires auth)
//! POST /checkout                   - Place order (requires auth)
//!
//! # Auth (rate limited)
//! GET  /login, POST /login         - Login
//! GET  /register, POST /register   - Registration
//! GET  /logout                     - Logout
//!
//! # Admin (requires admin)
//! GET  /admin/dashboard            - Products and orders
//! GET  /admin/add_product          - New product form
//! POST /admin/add_product          - Create product (multipart)
//! GET  /admin/edit_product/{id}    - Edit product form
//! POST /admin/edit_product/{id}    - Update product (multipart)
//! POST /admin/delete_product/{id}  - Archive product
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod health;
pub mod home;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Largest accepted admin form body, image included.
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

/// `?page=` query for paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

impl PageQuery {
    /// The requested page, 1 when absent or zero.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Create the auth routes router.
pub fn auth_routes(rate_limit: bool) -> Router<AppState> {
    let limited = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register));

    let limited = if rate_limit {
        limited.layer(auth_rate_limiter())
    } else {
        limited
    };

    limited.route("/logout", get(auth::logout))
}

/// Create the cart and checkout routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add_to_cart/{id}", post(cart::add))
        .route("/cart", get(cart::show))
        .route("/remove_from_cart/{id}", post(cart::remove))
        .route("/checkout", get(cart::review).post(cart::checkout))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route(
            "/add_product",
            get(admin::new_product).post(admin::create_product),
        )
        .route(
            "/edit_product/{id}",
            get(admin::edit_product).post(admin::update_product),
        )
        .route("/delete_product/{id}", post(admin::delete_product))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create all routes for the shop.
pub fn routes(rate_limit_auth: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/product/{id}", get(home::product))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes(rate_limit_auth))
        .merge(cart_routes())
        .nest("/admin", admin_routes())
}
