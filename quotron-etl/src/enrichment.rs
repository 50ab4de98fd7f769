//! Assigns venue, source, batch identifier, and created_at (spec.md §4.7).

use chrono::Utc;
use quotron_core::normalize::INDEX_ALIASES;
use quotron_types::{MarketIndex, Quote, Venue};
use uuid::Uuid;

/// Stamp a quote with its batch identifier and venue (the venue the
/// provider reported is kept as-is; this only fills gaps for rows that
/// arrived without one, e.g. `Venue::Other`).
pub fn enrich_quote(mut quote: Quote, batch_id: Uuid) -> Quote {
    quote.batch_id = Some(batch_id);
    quote
}

/// Stamp a market index with its batch identifier, synthesizing a symbol
/// from the index-alias table in reverse when one is missing.
pub fn enrich_index(mut index: MarketIndex, batch_id: Uuid) -> MarketIndex {
    index.batch_id = Some(batch_id);
    if index.symbol.is_empty() {
        index.symbol = synthesize_index_symbol(&index.name).unwrap_or_else(|| index.name.clone());
    }
    index
}

/// Reverse lookup into the index-alias table: given a common name like
/// `"Dow Jones"`, find its canonical `^`-prefixed symbol.
#[must_use]
pub fn synthesize_index_symbol(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    INDEX_ALIASES
        .iter()
        .find(|(aliases, _canonical)| aliases.contains(&lower.as_str()))
        .map(|(_aliases, canonical)| (*canonical).to_string())
}

/// Current instant, used as `created_at` for newly persisted rows.
#[must_use]
pub fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}

/// Infer venue from an exchange label the way the provider layer would,
/// used when enriching rows arriving with a raw exchange string rather
/// than an already-typed [`Venue`].
#[must_use]
pub fn venue_from_label(label: &str) -> Venue {
    match label.to_uppercase() {
        l if l.contains("NASDAQ") => Venue::Nasdaq,
        l if l.contains("NYSE") => Venue::Nyse,
        l if l.contains("AMEX") => Venue::Amex,
        l if l.contains("OTC") => Venue::Otc,
        l if l.contains("CRYPTO") || l.contains("CCC") => Venue::Crypto,
        _ => Venue::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_alias_lookup_finds_canonical_symbol() {
        assert_eq!(synthesize_index_symbol("DJIA"), Some("^DJI".to_string()));
        assert_eq!(synthesize_index_symbol("sp500"), Some("^GSPC".to_string()));
    }

    #[test]
    fn unknown_name_has_no_alias() {
        assert_eq!(synthesize_index_symbol("Not A Real Index"), None);
    }
}
