//! HTTP middleware stack for the shop.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on login and registration (governor)

pub mod auth;
pub mod flash;
pub mod page;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, login_url, set_current_user,
};
pub use flash::{push_flash, take_flashes};
pub use page::PageContext;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, load_cart, login_expiry, save_cart, session_layer};
