//! Symbol normalization, fixed once here per spec.md §9's Open Question
//! (the corpus this was distilled from normalized crypto symbols
//! inconsistently across clients; this workspace normalizes once, at the
//! provider boundary, and nowhere else).

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters that make a symbol outright invalid input, rejected before any
/// normalization is attempted (spec.md §4.1).
const DISALLOWED_CHARS: &[char] = &['(', ')', '[', ']', '{', '}', '<', '>', ',', ';', '\'', '`', '"'];

/// Maximum symbol length accepted as input.
const MAX_SYMBOL_LEN: usize = 15;

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([A-Za-z0-9.\-]+)\)").unwrap());

/// Validated, normalized symbol form. See [`crate::quote::QUOTE_SYMBOL_PATTERN`]
/// for the shape this is expected to satisfy once normalized.
pub const QUOTE_SYMBOL_PATTERN: &str = r"^\^?[A-Z0-9]+(-[A-Z]{3})?$";

static SYMBOL_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(QUOTE_SYMBOL_PATTERN).unwrap());

/// Fixed index-alias table (spec.md §4.1 and §8's alias round-trip property).
/// Known index aliases mapped to their canonical `^`-prefixed symbol
/// (lowercase alias forms, spec.md §4.1).
pub const INDEX_ALIASES: &[(&[&str], &str)] = &[
    (&["s&p 500", "sp500", "spx"], "^GSPC"),
    (&["dow", "djia"], "^DJI"),
    (&["nasdaq"], "^IXIC"),
    (&["russell 2000"], "^RUT"),
    (&["vix"], "^VIX"),
];

/// Reject a raw symbol input before normalization is attempted.
///
/// # Errors
/// Returns a human-readable reason when the input contains a disallowed
/// character or exceeds the maximum accepted length.
pub fn reject_invalid_input(raw: &str) -> Result<(), String> {
    if raw.len() > MAX_SYMBOL_LEN {
        return Err(format!("symbol exceeds {MAX_SYMBOL_LEN} characters: {raw}"));
    }
    if raw.chars().any(|c| DISALLOWED_CHARS.contains(&c)) {
        return Err(format!("symbol contains a disallowed character: {raw}"));
    }
    Ok(())
}

/// Whether a crypto symbol (already stripped/uppercased) has a currency
/// suffix of the `-XXX` shape.
fn has_currency_suffix(s: &str) -> bool {
    match s.rsplit_once('-') {
        Some((_, suffix)) => suffix.len() == 3 && suffix.chars().all(|c| c.is_ascii_uppercase()),
        None => false,
    }
}

/// Look up `candidate` (already lowercased and trimmed) in the index alias
/// table, returning the canonical `^XXX` symbol if found.
fn lookup_index_alias(candidate: &str) -> Option<&'static str> {
    INDEX_ALIASES
        .iter()
        .find(|(aliases, _)| aliases.contains(&candidate))
        .map(|(_, canonical)| *canonical)
}

/// Normalize an equity/index symbol per spec.md §4.1: strip whitespace,
/// extract the ticker from parenthetical forms, map known index aliases,
/// and pass already-prefixed `^XXX` symbols through.
///
/// Idempotent: `normalize_equity(normalize_equity(s)) == normalize_equity(s)`
/// for every input in the test corpus (spec.md §8).
#[must_use]
pub fn normalize_equity(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(alias) = lookup_index_alias(&trimmed.to_lowercase()) {
        return alias.to_string();
    }

    let extracted = PARENTHETICAL
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    let upper = extracted.trim().to_uppercase();

    if let Some(alias) = lookup_index_alias(&upper.to_lowercase()) {
        return alias.to_string();
    }

    upper
}

/// Normalize a cryptocurrency symbol per spec.md §4.1: strip whitespace,
/// extract from parenthetical forms, append `-USD` when no currency suffix
/// is already present.
#[must_use]
pub fn normalize_crypto(raw: &str) -> String {
    let trimmed = raw.trim();

    let extracted = PARENTHETICAL
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    let upper = extracted.trim().to_uppercase();

    if has_currency_suffix(&upper) {
        upper
    } else {
        format!("{upper}-USD")
    }
}

/// Whether a normalized symbol matches the shape required by spec.md §3.
#[must_use]
pub fn matches_quote_shape(symbol: &str) -> bool {
    SYMBOL_SHAPE.is_match(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parenthetical_extraction() {
        assert_eq!(normalize_crypto("Bitcoin (BTC)-USD"), "BTC-USD");
        assert_eq!(normalize_crypto("Bitcoin (BTC)"), "BTC-USD");
    }

    #[test]
    fn crypto_without_dash_gets_usd_suffix() {
        assert_eq!(normalize_crypto("eth"), "ETH-USD");
        assert_eq!(normalize_crypto("ETH-EUR"), "ETH-EUR");
    }

    #[test]
    fn index_aliases_map_to_canonical_symbols() {
        for (aliases, canonical) in INDEX_ALIASES {
            for alias in *aliases {
                assert_eq!(normalize_equity(alias), *canonical);
            }
        }
    }

    #[test]
    fn already_prefixed_caret_symbols_pass_through() {
        assert_eq!(normalize_equity("^GSPC"), "^GSPC");
        assert_eq!(normalize_equity(" ^djia "), "^DJIA");
    }

    #[test]
    fn rejects_disallowed_characters_and_long_symbols() {
        assert!(reject_invalid_input("AAPL;DROP").is_err());
        assert!(reject_invalid_input(&"A".repeat(16)).is_err());
        assert!(reject_invalid_input("AAPL").is_ok());
    }

    proptest! {
        #[test]
        fn equity_normalization_is_idempotent(s in "[A-Za-z0-9 ()&.\\-]{0,20}") {
            let once = normalize_equity(&s);
            let twice = normalize_equity(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn crypto_normalization_is_idempotent(s in "[A-Za-z0-9 ()\\-]{0,20}") {
            let once = normalize_crypto(&s);
            let twice = normalize_crypto(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
