//! quotron-gateway
//!
//! Thin HTTP/WebSocket façade in front of the failover chain and stream bus
//! (spec.md §4.9, component C9).
#![warn(missing_docs)]

/// Bridges the alert stream into an in-process broadcast channel.
pub mod alerts;
/// Central token-bucket rate limiter.
pub mod rate_limit;
/// `GET /api/...` handlers.
pub mod rest;
/// Shared application state.
pub mod state;
/// The `/ws` WebSocket endpoint and its typed message taxonomy.
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use rate_limit::GatewayRateLimiter;
use state::AppState;
use tower_http::trace::TraceLayer;

pub use rate_limit::enforce as rate_limit_middleware;
pub use state::AppState as GatewayState;
pub use ws::{Command, WsMessage};

/// Build the full gateway router: REST routes, the WebSocket upgrade route,
/// request tracing, and the central rate limiter.
#[must_use]
pub fn build_router(state: Arc<AppState>, requests_per_minute: u32) -> Router {
    let limiter = GatewayRateLimiter::new(requests_per_minute);

    rest::router()
        .route("/ws", get(ws::ws_handler))
        .layer(axum::middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
