/// Price-note grammar and currency alias tables
///
/// Notes look like `~price 5 chaos` or `~b/o 1/2 exa`. The strict regex
/// keeps the currency token free of spaces; the tolerant one admits
/// spelled-out names like `orb of chance` and is only used as a one-shot
/// fallback when the strict token resolves to nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Strict grammar: `~price`/`~b/o`, an amount, a space-free currency token
pub static PRICE_RE: Lazy<Regex> = Lazy::new(||
    Regex::new(r"~(price|b/o)\s+(\S+)\s+([a-zA-Z0-9'-]+)").unwrap()
);

/// Tolerant grammar: same, but the currency token may contain spaces
pub static PRICE_WITH_SPACE_RE: Lazy<Regex> = Lazy::new(||
    Regex::new(r"~(price|b/o)\s+(\S+)\s+([a-zA-Z0-9' -]+)").unwrap()
);

/// Abbreviations the trade site itself uses
pub static OFFICIAL_CURRENCIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("alch", "Orb of Alchemy"),
        ("alt", "Orb of Alteration"),
        ("blessed", "Blessed Orb"),
        ("chance", "Orb of Chance"),
        ("chaos", "Chaos Orb"),
        ("chisel", "Cartographer's Chisel"),
        ("chrom", "Chromatic Orb"),
        ("divine", "Divine Orb"),
        ("exa", "Exalted Orb"),
        ("fuse", "Orb of Fusing"),
        ("gcp", "Gemcutter's Prism"),
        ("jew", "Jeweller's Orb"),
        ("mirror", "Mirror of Kalandra"),
        ("regal", "Regal Orb"),
        ("regret", "Orb of Regret"),
        ("scour", "Orb of Scouring"),
        ("vaal", "Vaal Orb"),
    ])
});

/// Shorthands the player base uses but the trade site does not
pub static UNOFFICIAL_CURRENCIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("alchemy", "Orb of Alchemy"),
        ("alts", "Orb of Alteration"),
        ("bless", "Blessed Orb"),
        ("c", "Chaos Orb"),
        ("cart", "Cartographer's Chisel"),
        ("chisels", "Cartographer's Chisel"),
        ("chromatic", "Chromatic Orb"),
        ("chrome", "Chromatic Orb"),
        ("div", "Divine Orb"),
        ("ex", "Exalted Orb"),
        ("exalt", "Exalted Orb"),
        ("exalted", "Exalted Orb"),
        ("fus", "Orb of Fusing"),
        ("fusing", "Orb of Fusing"),
        ("jeweller", "Jeweller's Orb"),
        ("jewellers", "Jeweller's Orb"),
        ("mir", "Mirror of Kalandra"),
        ("port", "Portal Scroll"),
        ("portal", "Portal Scroll"),
        ("silver", "Silver Coin"),
        ("vaals", "Vaal Orb"),
        ("wis", "Scroll of Wisdom"),
        ("wisdom", "Scroll of Wisdom"),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_regex_captures_groups() {
        let caps = PRICE_RE.captures("my stuff ~price 1/2 exa cheap").unwrap();
        assert_eq!(&caps[1], "price");
        assert_eq!(&caps[2], "1/2");
        assert_eq!(&caps[3], "exa");
    }

    #[test]
    fn test_buyout_marker() {
        let caps = PRICE_RE.captures("~b/o 12 chaos").unwrap();
        assert_eq!(&caps[1], "b/o");
        assert_eq!(&caps[2], "12");
        assert_eq!(&caps[3], "chaos");
    }

    #[test]
    fn test_space_regex_admits_full_names() {
        let caps = PRICE_WITH_SPACE_RE.captures("~price 1 orb of chance").unwrap();
        assert_eq!(&caps[3], "orb of chance");
    }

    #[test]
    fn test_tables_do_not_collide() {
        for key in UNOFFICIAL_CURRENCIES.keys() {
            assert!(
                !OFFICIAL_CURRENCIES.contains_key(key),
                "unofficial alias {} shadows an official one",
                key
            );
        }
    }
}
