/// Feed ingestion
///
/// Pulls pages from the public stash feed and persists them. Each page is
/// written in one transaction; a re-seen stash has its previous items
/// marked inactive before the page's items flip back to active.

use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::time::Duration;

use anyhow::Result;

use crate::database::Database;
use crate::logger::{ self, LogTag };
use crate::stash_api::StashClient;

/// How long to back off after the client has exhausted its own retries
const FAILED_FETCH_SLEEP_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Cursor to resume the feed from
    pub next_id: Option<String>,
    /// Override the feed root, e.g. for a mock server
    pub api_root: Option<String>,
}

/// Pull the feed until cancelled
pub async fn run_ingest(
    db: &Database,
    options: IngestOptions,
    shutdown: Arc<AtomicBool>
) -> Result<()> {
    let mut client = match &options.api_root {
        Some(root) => StashClient::with_api_root(root, options.next_id.clone()),
        None => StashClient::new(options.next_id.clone()),
    };

    while !shutdown.load(Ordering::Relaxed) {
        let stashes = match client.get_next().await {
            Ok(stashes) => stashes,
            Err(e) => {
                // The client already retried with backoff; log and keep
                // polling rather than dying mid-stream
                logger::error(LogTag::Ingest, &format!("Feed fetch failed: {}", e));
                tokio::time::sleep(Duration::from_secs(FAILED_FETCH_SLEEP_SECS)).await;
                continue;
            }
        };

        ingest_page(db, &stashes)?;

        if let Some(cursor) = client.next_change_id() {
            logger::info(
                LogTag::Ingest,
                &format!("Ingested {} stashes, next cursor {}", stashes.len(), cursor)
            );
        }
    }

    Ok(())
}

/// Persist one feed page in a single transaction
pub fn ingest_page(db: &Database, stashes: &[crate::stash_api::ApiStash]) -> Result<()> {
    db.begin_block()?;

    let mut item_count = 0usize;
    for stash in stashes {
        match db.insert_api_stash(stash, true) {
            Ok(_) => {
                item_count += stash.api_item_count();
            }
            Err(e) => {
                let _ = db.rollback_block();
                return Err(e);
            }
        }
    }

    db.commit_block()?;
    logger::debug(
        LogTag::Ingest,
        &format!("Wrote {} stashes with {} items", stashes.len(), item_count)
    );

    Ok(())
}
