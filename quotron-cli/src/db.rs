//! Builds a Postgres connection string from the `DB_*` environment
//! variables (spec.md §6). `AppConfig` carries no database fields, so the
//! binary reads these directly rather than threading them through config.

/// Assemble a `postgres://` URL from `DB_HOST/DB_PORT/DB_NAME/DB_USER/DB_PASSWORD/DB_SSL_MODE`,
/// each defaulting to a local development value when unset.
#[must_use]
pub fn url() -> String {
    let host = std::env::var("DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let name = std::env::var("DB_NAME").unwrap_or_else(|_| "quotron".to_string());
    let user = std::env::var("DB_USER").unwrap_or_else(|_| "quotron".to_string());
    let password = std::env::var("DB_PASSWORD").unwrap_or_default();
    let ssl_mode = std::env::var("DB_SSL_MODE").unwrap_or_else(|_| "prefer".to_string());
    format!("postgres://{user}:{password}@{host}:{port}/{name}?sslmode={ssl_mode}")
}
