use serde_json::Value;

/// Database configuration and connection details
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "poefixer.db".to_string(),
        }
    }
}

/// Result wrapper for database operations
pub type DatabaseResult<T> = anyhow::Result<T>;

/// A recorded sale offer, one-to-one with an item
#[derive(Debug, Clone)]
pub struct Sale {
    pub id: i64,
    pub item_id: i64,
    pub item_api_id: String,
    /// Canonical item name: `typeLine` for currency items, else
    /// `"{name} {typeLine}"` trimmed
    pub name: String,
    pub is_currency: bool,
    pub sale_currency: String,
    pub sale_amount: f64,
    /// Chaos value written at extraction time from summaries current at
    /// that moment; never back-filled by later trades
    pub sale_amount_chaos: Option<f64>,
    pub item_updated_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Weighted exchange-rate statistics for one `(from, to, league)` bucket
#[derive(Debug, Clone)]
pub struct CurrencySummary {
    pub id: i64,
    pub from_currency: String,
    pub to_currency: String,
    pub league: String,
    /// Rows considered after outlier rejection
    pub count: i64,
    pub mean: f64,
    pub standard_dev: f64,
    /// Sum of time-decayed weights; used as a reliability score
    pub weight: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A joined `(item, stash)` row as consumed by the currency processor
#[derive(Debug, Clone)]
pub struct ItemStashRow {
    pub item_id: i64,
    pub item_api_id: String,
    pub name: String,
    pub type_line: String,
    pub note: Option<String>,
    pub league: String,
    pub category: Option<Value>,
    pub updated_at: i64,
    pub stash_name: Option<String>,
}

impl ItemStashRow {
    /// Whether the item is a currency item (`category` has a `currency` key)
    pub fn is_currency(&self) -> bool {
        match &self.category {
            Some(Value::Object(map)) => map.contains_key("currency"),
            _ => false,
        }
    }

    /// Canonical sale name for this item
    pub fn sale_name(&self) -> String {
        if self.is_currency() {
            self.type_line.clone()
        } else {
            format!("{} {}", self.name, self.type_line).trim().to_string()
        }
    }
}

/// A sale row joined to its item's league, as used for bucket statistics
#[derive(Debug, Clone, Copy)]
pub struct SaleObservation {
    pub sale_amount: f64,
    pub item_updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_currency_item_uses_type_line() {
        let row = ItemStashRow {
            item_id: 1,
            item_api_id: "abc".into(),
            name: "".into(),
            type_line: "Chaos Orb".into(),
            note: None,
            league: "Standard".into(),
            category: Some(json!({"currency": []})),
            updated_at: 0,
            stash_name: None,
        };
        assert!(row.is_currency());
        assert_eq!(row.sale_name(), "Chaos Orb");
    }

    #[test]
    fn test_named_item_joins_name_and_type_line() {
        let row = ItemStashRow {
            item_id: 1,
            item_api_id: "abc".into(),
            name: "Voidheart".into(),
            type_line: "Iron Ring".into(),
            note: None,
            league: "Standard".into(),
            category: Some(json!({"accessories": ["ring"]})),
            updated_at: 0,
            stash_name: None,
        };
        assert!(!row.is_currency());
        assert_eq!(row.sale_name(), "Voidheart Iron Ring");
    }

    #[test]
    fn test_unnamed_item_trims_leading_space() {
        let row = ItemStashRow {
            item_id: 1,
            item_api_id: "abc".into(),
            name: "".into(),
            type_line: "Leather Belt".into(),
            note: None,
            league: "Standard".into(),
            category: None,
            updated_at: 0,
            stash_name: None,
        };
        assert_eq!(row.sale_name(), "Leather Belt");
    }
}
