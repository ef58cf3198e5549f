use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::logger::{ self, LogTag };

/// Leading `<<...>>` markup the feed prepends to some names
static MARKUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<<.*>>").unwrap());

/// Errors from the stash feed client
#[derive(Debug, Error)]
pub enum StashApiError {
    #[error("feed request failed: {0}")] Http(#[from] reqwest::Error),
    #[error("feed returned status {0} after {1} attempts")] Status(u16, u32),
    #[error("malformed feed response: {0}")] Decode(#[from] serde_json::Error),
}

pub type StashApiResult<T> = Result<T, StashApiError>;

/// Raw page shape of the public stash feed
///
/// Stashes are kept as raw JSON and validated one by one so a single
/// malformed entry cannot fail the page.
#[derive(Debug, Deserialize)]
pub struct StashTabsPage {
    pub next_change_id: String,
    #[serde(default)]
    pub stashes: Vec<Value>,
}

impl StashTabsPage {
    /// Decode and validate the page's stashes, skipping invalid entries
    /// with a warning
    pub fn valid_stashes(self) -> Vec<ApiStash> {
        self.stashes
            .into_iter()
            .filter_map(|raw| {
                match serde_json::from_value::<ApiStash>(raw) {
                    Ok(stash) => Some(stash),
                    Err(e) => {
                        logger::warn(LogTag::Api, &format!("Invalid stash: {}", e));
                        None
                    }
                }
            })
            .collect()
    }
}

/// A stash tab: a collection of items in an x/y grid
///
/// Unknown feed fields are ignored; `id`, `stashType` and `public` are
/// required and fail deserialization when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiStash {
    pub id: String,
    #[serde(rename = "accountName")]
    pub account_name: Option<String>,
    #[serde(rename = "lastCharacterName")]
    pub last_character_name: Option<String>,
    /// Display name; by convention may carry a `~price`/`~b/o` tag
    pub stash: Option<String>,
    #[serde(rename = "stashType")]
    pub stash_type: String,
    pub public: bool,
    #[serde(default)]
    items: Vec<Value>,
}

impl ApiStash {
    /// Decode and validate the stash's items, skipping invalid entries
    /// with a warning
    pub fn valid_items(&self) -> Vec<ApiItem> {
        self.items
            .iter()
            .filter_map(|raw| {
                match serde_json::from_value::<ApiItem>(raw.clone()) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        logger::warn(LogTag::Api, &format!("Invalid item: {}", e));
                        None
                    }
                }
            })
            .collect()
    }

    /// Number of items the feed reported, before validation
    pub fn api_item_count(&self) -> usize {
        self.items.len()
    }
}

/// The core item structure as the feed delivers it
///
/// The descriptive mod lists and similar structured values are passed
/// through unchanged as JSON; the processor never inspects them.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiItem {
    pub id: String,
    pub h: i64,
    pub w: i64,
    pub x: i64,
    pub y: i64,
    #[serde(rename = "abyssJewel", default)]
    pub abyss_jewel: bool,
    #[serde(rename = "artFilename")]
    pub art_filename: Option<String>,
    pub category: Option<Value>,
    #[serde(default)]
    pub corrupted: bool,
    #[serde(rename = "cosmeticMods")]
    pub cosmetic_mods: Option<Value>,
    #[serde(rename = "craftedMods")]
    pub crafted_mods: Option<Value>,
    #[serde(rename = "descrText")]
    pub descr_text: Option<String>,
    #[serde(default)]
    pub duplicated: bool,
    #[serde(default)]
    pub elder: bool,
    #[serde(rename = "enchantMods")]
    pub enchant_mods: Option<Value>,
    #[serde(rename = "explicitMods")]
    pub explicit_mods: Option<Value>,
    #[serde(rename = "flavourText")]
    pub flavour_text: Option<Value>,
    #[serde(rename = "frameType")]
    pub frame_type: i64,
    pub icon: String,
    pub identified: bool,
    pub ilvl: i64,
    #[serde(rename = "implicitMods")]
    pub implicit_mods: Option<Value>,
    #[serde(rename = "inventoryId")]
    pub inventory_id: Option<String>,
    #[serde(rename = "isRelic", default)]
    pub is_relic: bool,
    pub league: String,
    #[serde(rename = "lockedToCharacter", default)]
    pub locked_to_character: bool,
    #[serde(rename = "maxStackSize")]
    pub max_stack_size: Option<i64>,
    pub name: String,
    #[serde(rename = "nextLevelRequirements")]
    pub next_level_requirements: Option<Value>,
    /// Free-text price tag, e.g. `~price 1 chaos`
    pub note: Option<String>,
    pub properties: Option<Value>,
    #[serde(rename = "prophecyDiffText")]
    pub prophecy_diff_text: Option<String>,
    #[serde(rename = "prophecyText")]
    pub prophecy_text: Option<String>,
    pub requirements: Option<Value>,
    #[serde(rename = "secDescrText")]
    pub sec_descr_text: Option<String>,
    #[serde(default)]
    pub shaper: bool,
    pub sockets: Option<Value>,
    #[serde(rename = "stackSize")]
    pub stack_size: Option<i64>,
    #[serde(default)]
    pub support: bool,
    #[serde(rename = "talismanTier")]
    pub talisman_tier: Option<i64>,
    #[serde(rename = "typeLine")]
    pub type_line: String,
    #[serde(rename = "utilityMods")]
    pub utility_mods: Option<Value>,
    pub verified: bool,
}

impl ApiItem {
    /// The basic name of the item, markup stripped
    pub fn clean_name(&self) -> String {
        strip_markup(&self.name)
    }

    /// The type of the item, markup stripped
    pub fn clean_type_line(&self) -> String {
        strip_markup(&self.type_line)
    }
}

/// Strip the feed's leading `<<...>>` markup from a name
fn strip_markup(value: &str) -> String {
    MARKUP_RE.replace(value, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item(overrides: Value) -> Value {
        let mut base = json!({
            "id": "deadbeef",
            "h": 1, "w": 2, "x": 0, "y": 0,
            "frameType": 5,
            "icon": "http://example.invalid/icon.png",
            "identified": true,
            "ilvl": 0,
            "league": "Standard",
            "name": "",
            "typeLine": "Chaos Orb",
            "verified": true,
            "category": {"currency": []}
        });
        if let (Some(base_map), Value::Object(extra)) = (base.as_object_mut(), overrides) {
            for (k, v) in extra {
                base_map.insert(k, v);
            }
        }
        base
    }

    #[test]
    fn test_markup_is_stripped() {
        let raw = sample_item(json!({
            "name": "<<set:MS>><<set:M>><<set:S>>Voidheart",
            "typeLine": "Iron Ring"
        }));
        let item: ApiItem = serde_json::from_value(raw).unwrap();
        assert_eq!(item.clean_name(), "Voidheart");
        assert_eq!(item.clean_type_line(), "Iron Ring");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let raw = sample_item(json!({"someFutureField": {"nested": true}}));
        assert!(serde_json::from_value::<ApiItem>(raw).is_ok());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let mut raw = sample_item(json!({}));
        raw.as_object_mut().unwrap().remove("league");
        assert!(serde_json::from_value::<ApiItem>(raw).is_err());
    }

    #[test]
    fn test_invalid_items_are_skipped() {
        let stash: ApiStash = serde_json::from_value(
            json!({
                "id": "cafe",
                "stashType": "PremiumStash",
                "public": true,
                "items": [sample_item(json!({})), json!({"id": "broken"})]
            })
        ).unwrap();
        assert_eq!(stash.api_item_count(), 2);
        assert_eq!(stash.valid_items().len(), 1);
    }
}
