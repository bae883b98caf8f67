//! Corner Shop storefront library.
//!
//! The whole web application lives here so the binary stays a thin startup
//! shim and the router can be driven in-process by the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, middleware as axum_middleware};
use tower_http::{
    services::ServeDir,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::middleware::session::ShopSessionLayer;
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Build the application router with every route and middleware layer.
///
/// The session layer is passed in so tests can use an in-memory store.
/// Sentry layers are added by the binary around the returned router.
pub fn app<S>(state: AppState, session_layer: ShopSessionLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let static_files = Router::new()
        .nest_service("/images", ServeDir::new(state.images().dir()))
        .fallback_service(ServeDir::new(&state.config().static_dir));

    let routes = routes::routes(state.config().rate_limit_auth).nest("/static", static_files);
    with_layers(routes, state, session_layer)
}

/// Wrap `routes` in the session, security header, request ID, and tracing
/// layers, then attach the state.
pub fn with_layers<S>(
    routes: Router<AppState>,
    state: AppState,
    session_layer: ShopSessionLayer<S>,
) -> Router
where
    S: SessionStore + Clone,
{
    routes
        .layer(session_layer)
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
