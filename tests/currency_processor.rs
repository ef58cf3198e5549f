use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use serde_json::{ json, Value };
use tokio::time::sleep;

use poefixer::currency::{ CurrencyPostprocessor, ProcessorOptions };
use poefixer::database::Database;
use poefixer::ingest::ingest_page;
use poefixer::stash_api::ApiStash;

/// Feed payload for one currency item priced with `note`
fn currency_item(type_line: &str, offset: u64, note: &str) -> Value {
    json!({
        // Boilerplate fields:
        "w": 2, "h": 1, "x": 1, "y": 1, "ilvl": 0, "league": "Standard",
        "frameType": 5, "icon": "X", "identified": true, "verified": true,
        // Currency-specific info:
        "id": format!("{:064x}", offset),
        "name": "",
        "typeLine": type_line,
        "note": note,
        "category": {"currency": []}
    })
}

fn stash_with_items(api_id: &str, items: Vec<Value>) -> ApiStash {
    serde_json
        ::from_value(
            json!({
                "id": api_id,
                "accountName": "JoeTest",
                "stash": "Goodies",
                "stashType": "PremiumStash",
                "public": true,
                "items": items
            })
        )
        .unwrap()
}

async fn run_processor(db: &Database, options: ProcessorOptions) {
    let shutdown = Arc::new(AtomicBool::new(false));
    CurrencyPostprocessor::new(db, options).run(shutdown).await.unwrap();
}

#[tokio::test]
async fn test_end_to_end_currency_scenario() {
    let db = Database::new(":memory:").unwrap();
    let stash = stash_with_items(
        "s1",
        vec![
            currency_item("Exalted Orb", 1, "~price 100 chaos"),
            currency_item("Chaos Orb", 2, "~price 1/100 exa")
        ]
    );
    ingest_page(&db, &[stash]).unwrap();

    run_processor(&db, ProcessorOptions::default()).await;

    assert_eq!(db.count_sales().unwrap(), 2);
    assert_eq!(db.count_summaries().unwrap(), 2);

    let exalted = db.get_summary("Exalted Orb", "Chaos Orb", "Standard").unwrap().unwrap();
    assert_eq!(exalted.count, 1);
    assert!((exalted.mean - 100.0).abs() < 1e-9);

    let chaos = db.get_summary("Chaos Orb", "Exalted Orb", "Standard").unwrap().unwrap();
    assert_eq!(chaos.count, 1);
    assert!((chaos.mean - 0.01).abs() < 1e-9);

    // The exalted sale was payable in chaos directly
    let sale = db
        .get_sale_by_item_api_id(&format!("{:064x}", 1))
        .unwrap()
        .unwrap();
    assert!(sale.is_currency);
    assert_eq!(sale.sale_currency, "Chaos Orb");
    assert_eq!(sale.sale_amount_chaos, Some(100.0));

    // The chaos sale routes through the exalted edge: 0.01 exa = 1 chaos
    let sale = db
        .get_sale_by_item_api_id(&format!("{:064x}", 2))
        .unwrap()
        .unwrap();
    assert!((sale.sale_amount_chaos.unwrap() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_outlier_rejection() {
    let db = Database::new(":memory:").unwrap();

    // Twenty consistent offers and one absurd one, all inside the window
    let mut items: Vec<Value> = (0..20)
        .map(|n| currency_item("Chaos Orb", n, "~price 0.01 exa"))
        .collect();
    items.push(currency_item("Chaos Orb", 20, "~price 100 exa"));
    ingest_page(&db, &[stash_with_items("s1", items)]).unwrap();

    // Caching off so the final recomputation sees the whole bucket
    let options = ProcessorOptions {
        recent: None,
        ..Default::default()
    };
    run_processor(&db, options).await;

    let summary = db.get_summary("Chaos Orb", "Exalted Orb", "Standard").unwrap().unwrap();
    assert_eq!(summary.count, 20);
    assert!((summary.mean - 0.01).abs() < 1e-6);
    assert!(summary.standard_dev >= 0.0);
    assert!(summary.weight > 0.0);
}

#[tokio::test]
async fn test_processing_is_idempotent() {
    let db = Database::new(":memory:").unwrap();
    let stash = stash_with_items(
        "s1",
        vec![
            currency_item("Exalted Orb", 1, "~price 100 chaos"),
            currency_item("Chaos Orb", 2, "~price 1/100 exa"),
            currency_item("Chromatic Orb", 3, "~b/o 3/2 chaos")
        ]
    );
    ingest_page(&db, &[stash]).unwrap();

    run_processor(&db, ProcessorOptions::default()).await;
    let first = snapshot(&db);

    // Driving again over the same input must not change any numbers
    run_processor(&db, ProcessorOptions::default()).await;
    let second = snapshot(&db);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.0, b.0);
        for (x, y) in a.1.iter().zip(&b.1) {
            assert!((x - y).abs() < 1e-9, "{}: {} != {}", a.0, x, y);
        }
    }
}

/// Natural keys and numeric values of every sale and summary row
fn snapshot(db: &Database) -> Vec<(String, Vec<f64>)> {
    let mut rows = Vec::new();
    for offset in 1..=3u64 {
        let api_id = format!("{:064x}", offset);
        if let Some(sale) = db.get_sale_by_item_api_id(&api_id).unwrap() {
            rows.push((
                format!("sale:{}:{}:{}", sale.name, sale.sale_currency, sale.is_currency),
                vec![
                    sale.sale_amount,
                    sale.sale_amount_chaos.unwrap_or(-1.0),
                    sale.item_updated_at as f64
                ],
            ));
        }
    }
    for (from, to) in [
        ("Exalted Orb", "Chaos Orb"),
        ("Chaos Orb", "Exalted Orb"),
        ("Chromatic Orb", "Chaos Orb"),
    ] {
        if let Some(summary) = db.get_summary(from, to, "Standard").unwrap() {
            rows.push((
                format!("summary:{}:{}", from, to),
                vec![
                    summary.count as f64,
                    summary.mean,
                    summary.standard_dev,
                    summary.weight
                ],
            ));
        }
    }
    rows
}

#[tokio::test]
async fn test_reingest_invalidates_missing_items() {
    let db = Database::new(":memory:").unwrap();
    let full = stash_with_items(
        "s1",
        vec![
            currency_item("Chaos Orb", 1, "~price 1 exa"),
            currency_item("Exalted Orb", 2, "~price 100 chaos")
        ]
    );
    ingest_page(&db, &[full]).unwrap();

    let id1 = format!("{:064x}", 1);
    let id2 = format!("{:064x}", 2);
    assert_eq!(db.item_active(&id1).unwrap(), Some(true));
    assert_eq!(db.item_active(&id2).unwrap(), Some(true));

    // The second sighting of the stash no longer contains item 2
    let subset = stash_with_items("s1", vec![currency_item("Chaos Orb", 1, "~price 1 exa")]);
    ingest_page(&db, &[subset]).unwrap();

    assert_eq!(db.item_active(&id1).unwrap(), Some(true));
    assert_eq!(db.item_active(&id2).unwrap(), Some(false));
}

#[tokio::test]
async fn test_resume_skips_already_processed_items() {
    let db = Database::new(":memory:").unwrap();

    ingest_page(
        &db,
        &[stash_with_items("s1", vec![currency_item("Exalted Orb", 1, "~price 100 chaos")])]
    ).unwrap();

    // Make sure the second stash lands on a later update time
    sleep(Duration::from_millis(1100)).await;

    ingest_page(
        &db,
        &[stash_with_items("s2", vec![currency_item("Chaos Orb", 2, "~price 1/100 exa")])]
    ).unwrap();

    run_processor(&db, ProcessorOptions::default()).await;
    assert_eq!(db.count_sales().unwrap(), 2);

    // The resume point is the newest processed item update time, and a
    // resumed scan reads nothing older than it
    let resume = db.last_processed_item_time().unwrap().unwrap();
    let older = db
        .get_sale_by_item_api_id(&format!("{:064x}", 1))
        .unwrap()
        .unwrap();
    assert!(older.item_updated_at < resume);

    let rows = db.fetch_process_block(Some(resume), 1000, 0).unwrap();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row.updated_at >= resume));
    assert!(rows.iter().all(|row| row.item_api_id != format!("{:064x}", 1)));

    // A fresh pass with no fixed start is a no-op on the numbers
    run_processor(&db, ProcessorOptions::default()).await;
    assert_eq!(db.count_sales().unwrap(), 2);
}

#[tokio::test]
async fn test_private_stashes_are_ignored() {
    let db = Database::new(":memory:").unwrap();
    let private: ApiStash = serde_json
        ::from_value(
            json!({
                "id": "s1",
                "stash": "Hidden",
                "stashType": "PremiumStash",
                "public": false,
                "items": [currency_item("Exalted Orb", 1, "~price 100 chaos")]
            })
        )
        .unwrap();
    ingest_page(&db, &[private]).unwrap();

    run_processor(&db, ProcessorOptions::default()).await;
    assert_eq!(db.count_sales().unwrap(), 0);
}

#[tokio::test]
async fn test_stash_price_tag_is_the_fallback() {
    let db = Database::new(":memory:").unwrap();

    // No item note, but the stash name itself carries the price
    let mut item = currency_item("Chaos Orb", 1, "");
    item.as_object_mut().unwrap().remove("note");
    let stash: ApiStash = serde_json
        ::from_value(
            json!({
                "id": "s1",
                "stash": "~b/o 2 exa",
                "stashType": "PremiumStash",
                "public": true,
                "items": [item]
            })
        )
        .unwrap();
    ingest_page(&db, &[stash]).unwrap();

    run_processor(&db, ProcessorOptions::default()).await;

    let sale = db
        .get_sale_by_item_api_id(&format!("{:064x}", 1))
        .unwrap()
        .unwrap();
    assert_eq!(sale.sale_currency, "Exalted Orb");
    assert!((sale.sale_amount - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unpriced_and_malformed_notes_record_no_sale() {
    let db = Database::new(":memory:").unwrap();
    let stash = stash_with_items(
        "s1",
        vec![
            // Not a price tag at all
            currency_item("Chaos Orb", 1, "my favourites"),
            // Unknown currency
            currency_item("Chaos Orb", 2, "~price 1 zorbo"),
            // Zero is not a price
            currency_item("Chaos Orb", 3, "~price 0 exa"),
            // Division by zero fails the note
            currency_item("Chaos Orb", 4, "~price 1/0 exa")
        ]
    );
    ingest_page(&db, &[stash]).unwrap();

    run_processor(&db, ProcessorOptions::default()).await;
    assert_eq!(db.count_sales().unwrap(), 0);
    assert_eq!(db.count_summaries().unwrap(), 0);
}

#[tokio::test]
async fn test_reopened_database_resumes_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("poe.db");
    let db_path = db_path.to_str().unwrap();

    {
        let db = Database::new(db_path).unwrap();
        ingest_page(
            &db,
            &[stash_with_items("s1", vec![currency_item("Exalted Orb", 1, "~price 100 chaos")])]
        ).unwrap();
        run_processor(&db, ProcessorOptions::default()).await;
        assert_eq!(db.count_sales().unwrap(), 1);
    }

    // Reopening runs the schema DDL again against existing tables, then
    // picks up where the sale history left off
    let db = Database::new(db_path).unwrap();
    assert_eq!(db.count_sales().unwrap(), 1);
    assert!(db.last_processed_item_time().unwrap().is_some());

    run_processor(&db, ProcessorOptions::default()).await;
    assert_eq!(db.count_sales().unwrap(), 1);
    assert_eq!(db.count_summaries().unwrap(), 1);
}

#[tokio::test]
async fn test_named_items_price_in_chaos() {
    let db = Database::new(":memory:").unwrap();
    let item = json!({
        "w": 2, "h": 1, "x": 1, "y": 1, "ilvl": 70, "league": "Standard",
        "frameType": 3, "icon": "X", "identified": true, "verified": true,
        "id": format!("{:064x}", 1),
        "name": "Voidheart",
        "typeLine": "Iron Ring",
        "note": "~price 30 chaos",
        "category": {"accessories": ["ring"]}
    });
    ingest_page(&db, &[stash_with_items("s1", vec![item])]).unwrap();

    run_processor(&db, ProcessorOptions::default()).await;

    let sale = db
        .get_sale_by_item_api_id(&format!("{:064x}", 1))
        .unwrap()
        .unwrap();
    assert!(!sale.is_currency);
    assert_eq!(sale.name, "Voidheart Iron Ring");
    // Non-currency sales never touch the summary table but still value
    assert_eq!(db.count_summaries().unwrap(), 0);
    assert_eq!(sale.sale_amount_chaos, Some(30.0));
}
