//! Central token-bucket rate limiter (spec.md §5: "Rate limits... enforced
//! by C1 (direct mode) and by C9 (central)").

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::Json;
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde_json::json;

/// One global bucket shared across every request to the gateway, refilled
/// at `requests_per_minute`.
#[derive(Clone)]
pub struct GatewayRateLimiter {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl GatewayRateLimiter {
    /// Build a limiter refilling at `requests_per_minute`, clamped to at
    /// least 1.
    #[must_use]
    pub fn new(requests_per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute.max(1)).unwrap());
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

/// Axum middleware rejecting requests with `429` once the bucket is empty.
pub async fn enforce(
    axum::extract::State(limiter): axum::extract::State<GatewayRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    match limiter.limiter.check() {
        Ok(()) => next.run(request).await.into_response(),
        Err(not_until) => {
            let retry_after = not_until.wait_time_from(DefaultClock::default().now()).as_secs();
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_after.to_string())],
                Json(json!({ "error": "rate limit exceeded", "retry_after_seconds": retry_after })),
            )
                .into_response()
        }
    }
}
