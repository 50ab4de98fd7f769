//! `quotron run` (spec.md §6): the long-running daemon — scheduler, alert
//! monitor, and HTTP/WebSocket gateway, wired together and run until
//! interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quotron_core::{AppConfig, QuotronError, StreamBus};
use quotron_etl::EtlStore;
use quotron_jobs::{MarketIndicesJob, QuoteJob, QuoteKind, StreamMaintenanceJob};
use quotron_providers::{SidecarSupervisor, SidecarSupervisorConfig};
use quotron_scheduler::{JobRegistry, Scheduler};
use quotron_stream::RedisStreamBus;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const DEFAULT_ALERT_TICK: Duration = Duration::from_secs(60);

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Run the scheduler, the alert monitor, and the gateway until `ctrl_c`.
///
/// # Errors
/// Returns an error if the database pool, Redis connection, or sidecar
/// process cannot be brought up.
pub async fn run(config: AppConfig) -> Result<(), QuotronError> {
    let sidecar = SidecarSupervisor::start(SidecarSupervisorConfig {
        source_prefix: "YAHOO".to_string(),
        script_path: PathBuf::from("sidecars/yahoo_proxy/start.sh"),
        default_port: 5001,
        pid_file: PathBuf::from("/tmp/quotron-yahoo-proxy.pid"),
    })
    .await?;

    let chains = quotron::build_chains(&config, sidecar.base_url());
    let equity = Arc::new(chains.equity);
    let crypto = Arc::new(chains.crypto);

    let stream: Arc<dyn StreamBus> = Arc::new(RedisStreamBus::connect(&redis_url()).await?);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&crate::db::url())
        .await
        .map_err(|e| QuotronError::Other(format!("failed to connect to database: {e}")))?;
    let store = Arc::new(EtlStore::new(pool));

    let output_dir = PathBuf::from(&config.output_dir);

    let mut registry = JobRegistry::new();
    registry.register(Arc::new(QuoteJob::new(
        QuoteKind::Stock,
        Arc::clone(&equity),
        Arc::clone(&stream),
        Arc::clone(&store),
        output_dir.clone(),
    )));
    registry.register(Arc::new(QuoteJob::new(
        QuoteKind::Crypto,
        Arc::clone(&crypto),
        Arc::clone(&stream),
        Arc::clone(&store),
        output_dir.clone(),
    )));
    registry.register(Arc::new(MarketIndicesJob::new(
        Arc::clone(&equity),
        Arc::clone(&stream),
        Arc::clone(&store),
        output_dir,
    )));
    registry.register(Arc::new(StreamMaintenanceJob::new(Arc::clone(&stream))));

    let scheduler = Scheduler::new(registry).await?;
    for (name, entry) in &config.schedules {
        if name == "alert_monitor" {
            continue; // driven by its own tick loop, not the cron scheduler
        }
        let Some(static_name) = job_name(name) else {
            warn!(schedule = name, "no job registered under this schedule name, skipping");
            continue;
        };
        scheduler.bind(static_name, entry).await?;
    }
    scheduler.start().await?;
    info!("scheduler started");

    let monitor = spawn_alert_monitor(&config, Arc::clone(&equity), Arc::clone(&stream));

    let gateway_state = Arc::new(quotron_gateway::GatewayState::new(
        Arc::clone(&equity),
        Arc::clone(&crypto),
        Arc::clone(&stream),
    ));
    let bridge_stream = Arc::clone(&stream);
    let bridge_tx = gateway_state.alerts.clone();
    let bridge = tokio::spawn(async move {
        if let Err(e) = quotron_gateway::alerts::bridge_alerts(bridge_stream.as_ref(), bridge_tx).await {
            warn!(error = %e, "alert bridge stopped");
        }
    });

    let router = quotron_gateway::build_router(Arc::clone(&gateway_state), 120);
    let addr = format!("{}:{}", config.api_service_host, config.api_service_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| QuotronError::Other(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "gateway listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    };
    if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown).await {
        warn!(error = %e, "gateway server exited");
    }

    bridge.abort();
    if let Some(monitor) = monitor {
        monitor.stop().await;
    }
    scheduler.shutdown(SHUTDOWN_GRACE).await;
    sidecar.shutdown().await;
    Ok(())
}

/// Map a `schedules` config key onto the `&'static str` name a [`JobRegistry`]
/// entry is keyed by. Schedule keys are free-form in the JSON file; jobs are
/// only ever looked up by one of these four fixed names.
fn job_name(key: &str) -> Option<&'static str> {
    match key {
        "stock_quotes" => Some("stock_quotes"),
        "crypto_quotes" => Some("crypto_quotes"),
        "market_indices" => Some("market_indices"),
        "stream_maintenance" => Some("stream_maintenance"),
        _ => None,
    }
}

fn spawn_alert_monitor(
    config: &AppConfig,
    equity: Arc<quotron::FailoverChain>,
    stream: Arc<dyn StreamBus>,
) -> Option<quotron_alerts::Monitor> {
    let entry = config.schedules.get("alert_monitor")?;
    if !entry.enabled {
        return None;
    }
    let symbols: Vec<String> = entry
        .parameters
        .get("symbols")
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    if symbols.is_empty() {
        warn!("alert_monitor schedule entry has no symbols configured, not starting");
        return None;
    }
    let threshold_percent: Decimal = entry
        .parameters
        .get("threshold_percent")
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| Decimal::new(500, 2));

    info!(symbols = symbols.len(), %threshold_percent, "starting alert monitor");
    Some(quotron_alerts::Monitor::spawn(
        equity,
        stream,
        quotron_alerts::MonitorConfig {
            symbols,
            threshold_percent,
            tick_interval: DEFAULT_ALERT_TICK,
        },
    ))
}
