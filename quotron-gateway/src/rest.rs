//! REST handlers (spec.md §4.9, §6): quote/index lookups delegate to the
//! failover chain; health endpoints report chain-wide status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use quotron_core::QuotronError;
use quotron_types::HealthReport;
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// Build the REST half of the gateway's router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/quote/{symbol}", get(get_quote))
        .route("/api/index/{name}", get(get_index))
        .route("/api/health", get(get_health))
        .route("/api/data-source/health", get(get_data_source_health))
}

fn status_for(err: &QuotronError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_GATEWAY
    }
}

async fn get_quote(State(state): State<Arc<AppState>>, Path(symbol): Path<String>) -> impl IntoResponse {
    match state.equity.get_stock_quote(&symbol).await {
        Ok(quote) => Json(quote).into_response(),
        Err(err) => (status_for(&err), Json(json!({ "error": err.to_string() }))).into_response(),
    }
}

async fn get_index(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> impl IntoResponse {
    match state.equity.get_market_index(&name).await {
        Ok(index) => Json(index).into_response(),
        Err(err) => (status_for(&err), Json(json!({ "error": err.to_string() }))).into_response(),
    }
}

#[derive(Serialize)]
struct GatewayHealth {
    status: &'static str,
    version: &'static str,
}

async fn get_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcomes = state.equity.health_check_all().await;
    let degraded = outcomes
        .iter()
        .all(|(_, outcome)| outcome.status.skip_in_failover());
    let status = if degraded { "degraded" } else { "ok" };
    Json(GatewayHealth {
        status,
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_data_source_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut reports = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (name, outcome) in state.equity.health_check_all().await {
        seen.insert(name);
        let mut report = HealthReport::unknown("provider", name);
        report.record(outcome.status, outcome.latency_ms, outcome.error);
        reports.push(report);
    }
    for (name, outcome) in state.crypto.health_check_all().await {
        if !seen.insert(name) {
            continue;
        }
        let mut report = HealthReport::unknown("provider", name);
        report.record(outcome.status, outcome.latency_ms, outcome.error);
        reports.push(report);
    }

    Json(reports)
}
