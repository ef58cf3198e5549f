use std::collections::HashMap;

use crate::currency::names::{ OFFICIAL_CURRENCIES, PRICE_RE, PRICE_WITH_SPACE_RE, UNOFFICIAL_CURRENCIES };
use crate::logger::{ self, LogTag };
use regex::Regex;

/// Mapping from lowercase/dashed currency spellings to canonical names
///
/// Rebuilt at the start of each processor pass from every `from_currency`
/// the summary table has seen, so the vocabulary grows with the economy.
/// Read-only during a pass.
#[derive(Debug, Default)]
pub struct AliasMap {
    mapping: HashMap<String, String>,
}

impl AliasMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the map from canonical names: each name N is reachable as
    /// `lower(N)`, the dashed form, and the dashed form with `'` removed
    pub fn from_names<I>(names: I) -> Self where I: IntoIterator<Item = String> {
        let mut mapping = HashMap::new();
        for name in names {
            let low = name.to_lowercase();
            let dashed = low.replace(' ', "-");
            let dashed_clean = dashed.replace('\'', "");
            mapping.insert(low, name.clone());
            mapping.insert(dashed, name.clone());
            mapping.insert(dashed_clean, name);
        }
        Self { mapping }
    }

    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.mapping.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

/// Parse a price out of a user-edited note
///
/// Returns the amount and the canonical currency name, or None when the
/// note carries no resolvable price. Resolution order is the official
/// table, then the unofficial table, then the dynamic alias map; an
/// unknown token triggers exactly one retry with the space-tolerant
/// grammar.
pub fn parse_note(note: Option<&str>, aliases: &AliasMap) -> Option<(f64, String)> {
    let note = note?;
    parse_with(note, &PRICE_RE, aliases, true)
}

fn parse_with(
    note: &str,
    regex: &Regex,
    aliases: &AliasMap,
    is_strict: bool
) -> Option<(f64, String)> {
    let caps = regex.captures(note)?;
    let amount_token = caps.get(2).map_or("", |m| m.as_str());
    let currency_token = caps.get(3).map_or("", |m| m.as_str());

    let amount = match parse_amount(amount_token) {
        Some(amount) => amount,
        None => {
            // Numeric garbage never triggers the tolerant-grammar retry
            logger::debug(LogTag::Currency, &format!("Invalid price: {:?}", note));
            return None;
        }
    };

    let low_cur = currency_token.to_lowercase();
    if let Some(full) = OFFICIAL_CURRENCIES.get(low_cur.as_str()) {
        return Some((amount, full.to_string()));
    }
    if let Some(full) = UNOFFICIAL_CURRENCIES.get(low_cur.as_str()) {
        return Some((amount, full.to_string()));
    }
    if let Some(full) = aliases.resolve(&low_cur) {
        return Some((amount, full.to_string()));
    }

    if is_strict {
        // The token may be a spelled-out name; try once with spaces allowed
        return parse_with(note, &PRICE_WITH_SPACE_RE, aliases, false);
    }

    logger::warn(
        LogTag::Currency,
        &format!("Currency note {:?} has unknown currency abbrev {}", note, currency_token)
    );
    None
}

/// Parse `decimal` or `decimal/decimal`; a zero denominator fails the note
fn parse_amount(token: &str) -> Option<f64> {
    let amount = if let Some((num, den)) = token.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den == 0.0 {
            return None;
        }
        num / den
    } else {
        token.parse().ok()?
    };
    amount.is_finite().then_some(amount)
}
