//! Configuration surface (spec.md §6): a JSON file overlaid with a handful
//! of recognized environment variables, loaded once at startup.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuotronError;

/// One entry in the `schedules` map: a job name bound to a cron expression,
/// an enabled flag, and free-form string parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// 5-field cron expression (minute hour day month day-of-week).
    pub cron: String,
    /// Whether the scheduler should register this entry.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Human-readable description, surfaced in operational tooling.
    #[serde(default)]
    pub description: String,
    /// Known keys: `symbols`, `indices`, `threshold_percent`. Unknown keys
    /// are passed through to the job unexamined (spec.md §4.5).
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

const fn default_true() -> bool {
    true
}

/// Top-level application configuration, the shape specified in spec.md §6.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Alpha Vantage API key. May be overridden by `ALPHA_VANTAGE_API_KEY`.
    pub api_key: String,
    /// Base URL for the primary REST API.
    pub api_base_url: String,
    /// Gateway (C9) host, when routing through it.
    pub api_service_host: String,
    /// Gateway (C9) port, when routing through it.
    pub api_service_port: u16,
    /// Whether jobs should route fetches through the gateway's central
    /// rate limiter rather than fetching directly.
    pub use_api_service: bool,
    /// Whether the secondary, keyless scraper provider is enabled.
    pub api_scraper: bool,
    /// Directory JSON artifacts are written to (spec.md §4.6, §6).
    pub output_dir: String,
    /// Cron schedule registry, keyed by job name.
    pub schedules: HashMap<String, ScheduleConfig>,
    /// Default log level, used to seed the tracing filter when `RUST_LOG`
    /// is unset.
    pub log_level: String,
    /// IANA timezone name the cron grid is evaluated in.
    pub timezone: String,
    /// How long a completed batch's filesystem artifacts are retained.
    pub retention_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://www.alphavantage.co".to_string(),
            api_service_host: "127.0.0.1".to_string(),
            api_service_port: 8080,
            use_api_service: false,
            api_scraper: true,
            output_dir: "data".to_string(),
            schedules: HashMap::new(),
            log_level: "info".to_string(),
            timezone: "UTC".to_string(),
            retention_seconds: 7 * 24 * 3600,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, then overlay recognized
    /// environment variables (spec.md §6). Unknown JSON keys are ignored.
    ///
    /// # Errors
    /// Returns [`QuotronError::Config`] if the file cannot be read/parsed,
    /// if a configured cron expression is not valid 5-field cron, or if
    /// `alpha_vantage` use is implied but no API key is available from
    /// either the file or the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QuotronError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| QuotronError::Config(format!("reading {:?}: {e}", path.as_ref())))?;
        let mut cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| QuotronError::Config(format!("parsing config: {e}")))?;
        cfg.overlay_env();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay the environment variables named in spec.md §6 onto this
    /// configuration, env taking precedence over the file.
    pub fn overlay_env(&mut self) {
        if let Ok(key) = std::env::var("ALPHA_VANTAGE_API_KEY") {
            self.api_key = key;
        }
        if let Ok(host) = std::env::var("API_SERVICE_HOST") {
            self.api_service_host = host;
        }
        if let Ok(port) = std::env::var("API_SERVICE_PORT") {
            if let Ok(port) = port.parse() {
                self.api_service_port = port;
            }
        }
        if let Ok(use_svc) = std::env::var("USE_API_SERVICE") {
            self.use_api_service = matches!(use_svc.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Validate cross-field invariants and cron grammar; called by [`Self::load`].
    ///
    /// # Errors
    /// Returns [`QuotronError::Config`] on the first violation found.
    pub fn validate(&self) -> Result<(), QuotronError> {
        for (name, entry) in &self.schedules {
            validate_five_field_cron(&entry.cron)
                .map_err(|e| QuotronError::Config(format!("schedule {name}: {e}")))?;
        }
        chrono_tz::Tz::from_str(&self.timezone)
            .map_err(|_| QuotronError::Config(format!("unknown timezone: {}", self.timezone)))?;
        if !self.use_api_service && self.api_key.is_empty() {
            return Err(QuotronError::Config(
                "no ALPHA_VANTAGE_API_KEY configured: required when use_api_service is false".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate that `expr` is a 5-field cron expression (minute hour day month
/// day-of-week) by prepending a synthetic seconds field and delegating to
/// the `cron` crate's parser, which natively expects 6+ fields.
///
/// # Errors
/// Returns a human-readable message when `expr` does not have exactly 5
/// whitespace-separated fields or does not parse as a valid cron grid.
pub fn validate_five_field_cron(expr: &str) -> Result<(), String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 cron fields, got {}: {expr}", fields.len()));
    }
    let with_seconds = format!("0 {expr}");
    cron::Schedule::from_str(&with_seconds)
        .map(|_| ())
        .map_err(|e| format!("invalid cron expression {expr}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_field_count() {
        assert!(validate_five_field_cron("* * *").is_err());
    }

    #[test]
    fn accepts_every_minute() {
        assert!(validate_five_field_cron("*/1 * * * *").is_ok());
    }

    #[test]
    fn unknown_config_keys_are_ignored() {
        let json = r#"{"api_key": "x", "totally_unknown_field": 42}"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.api_key, "x");
    }

    #[test]
    fn missing_api_key_without_api_service_is_a_config_error() {
        let cfg = AppConfig::default();
        assert!(matches!(cfg.validate(), Err(QuotronError::Config(_))));
    }

    #[test]
    fn missing_api_key_is_fine_when_api_service_is_used() {
        let mut cfg = AppConfig::default();
        cfg.use_api_service = true;
        assert!(cfg.validate().is_ok());
    }
}
