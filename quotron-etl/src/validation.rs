//! Row validation against the invariants in spec.md §3.

use std::collections::HashSet;

use chrono::{Duration as ChronoDuration, Utc};
use quotron_core::normalize::matches_quote_shape;
use quotron_core::QuotronError;
use quotron_types::Quote;
use rust_decimal::Decimal;

const CLOCK_SKEW_GUARD_MINUTES: i64 = 5;
const STALE_AFTER_HOURS: i64 = 24;
/// Tolerance for `change_percent` vs. its derived value (spec.md §3).
const CHANGE_PERCENT_TOLERANCE: f64 = 0.01;

/// Validate one quote row against §3's invariants. `seen` tracks
/// `(symbol, timestamp)` pairs already accepted in this batch so a repeat
/// is rejected as `duplicate_in_batch` rather than re-validated.
pub fn validate_quote(
    quote: &Quote,
    allow_historical_data: bool,
    seen: &mut HashSet<(String, i64)>,
) -> Result<(), QuotronError> {
    if !matches_quote_shape(&quote.symbol) {
        return Err(QuotronError::NormalizationFailed(quote.symbol.clone()));
    }
    if quote.price <= Decimal::ZERO {
        return Err(QuotronError::SchemaViolation(format!(
            "price must be positive, got {}",
            quote.price
        )));
    }

    let previous_close = quote.price - quote.change;
    if previous_close != Decimal::ZERO {
        let derived_percent = (quote.change / previous_close) * Decimal::from(100);
        let diff = (derived_percent - quote.change_percent).abs();
        let tolerance = Decimal::try_from(CHANGE_PERCENT_TOLERANCE).unwrap_or_default();
        if diff > tolerance {
            return Err(QuotronError::SchemaViolation(format!(
                "change_percent {} inconsistent with derived {derived_percent} (diff {diff})",
                quote.change_percent
            )));
        }
    }

    let now = Utc::now();
    if quote.timestamp > now + ChronoDuration::minutes(CLOCK_SKEW_GUARD_MINUTES) {
        return Err(QuotronError::SchemaViolation(format!(
            "timestamp {} is too far in the future",
            quote.timestamp
        )));
    }
    if !allow_historical_data && quote.timestamp < now - ChronoDuration::hours(STALE_AFTER_HOURS) {
        return Err(QuotronError::Stale);
    }

    let key = (quote.symbol.clone(), quote.timestamp.timestamp());
    if !seen.insert(key) {
        return Err(QuotronError::DuplicateInBatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotron_types::{Source, Venue};

    fn base_quote() -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            price: Decimal::new(10000, 2),
            change: Decimal::new(100, 2),
            change_percent: Decimal::new(101, 2),
            volume: 1000,
            timestamp: Utc::now(),
            exchange: Venue::Nasdaq,
            source: Source::AlphaVantage,
            batch_id: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_quote() {
        let mut seen = HashSet::new();
        assert!(validate_quote(&base_quote(), false, &mut seen).is_ok());
    }

    #[test]
    fn rejects_second_occurrence_of_same_symbol_timestamp() {
        let mut seen = HashSet::new();
        let quote = base_quote();
        validate_quote(&quote, false, &mut seen).unwrap();
        let err = validate_quote(&quote, false, &mut seen).unwrap_err();
        assert!(matches!(err, QuotronError::DuplicateInBatch));
    }

    #[test]
    fn rejects_stale_timestamp_unless_allowed() {
        let mut quote = base_quote();
        quote.timestamp = Utc::now() - ChronoDuration::hours(48);
        let mut seen = HashSet::new();
        assert!(matches!(
            validate_quote(&quote, false, &mut seen).unwrap_err(),
            QuotronError::Stale
        ));
        let mut seen = HashSet::new();
        assert!(validate_quote(&quote, true, &mut seen).is_ok());
    }

    #[test]
    fn rejects_future_clock_skew() {
        let mut quote = base_quote();
        quote.timestamp = Utc::now() + ChronoDuration::minutes(30);
        let mut seen = HashSet::new();
        assert!(matches!(
            validate_quote(&quote, false, &mut seen).unwrap_err(),
            QuotronError::SchemaViolation(_)
        ));
    }

    #[test]
    fn rejects_inconsistent_change_percent() {
        let mut quote = base_quote();
        quote.change_percent = Decimal::new(9999, 2);
        let mut seen = HashSet::new();
        assert!(matches!(
            validate_quote(&quote, false, &mut seen).unwrap_err(),
            QuotronError::SchemaViolation(_)
        ));
    }
}
