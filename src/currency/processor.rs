/// Currency post-processor
///
/// Takes the stash and item tables, which hold very nearly as-is feed
/// data, and crunches them down into the aggregates that represent the
/// economy: the `sale` and `currency_summary` tables.

use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::time::Duration;

use anyhow::Result;
use chrono::{ Local, TimeZone };

use crate::constants::{ IDLE_PASS_SLEEP_SECS, PROCESS_BLOCK_SIZE, SUMMARY_RECENT_SECS };
use crate::currency::parser::{ parse_note, AliasMap };
use crate::currency::summary::SummaryUpdater;
use crate::currency::valuation::find_value_of;
use crate::database::{ Database, DatabaseResult, ItemStashRow };
use crate::logger::{ self, LogTag };

/// Tuning knobs for the processor, filled from the CLI
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Fixed scan start; None resumes from the last recorded sale
    pub start_time: Option<i64>,
    /// Keep re-running passes until cancelled
    pub continuous: bool,
    /// Summary caching horizon in seconds; None disables caching
    pub recent: Option<i64>,
    /// Items fetched per block
    pub block_size: u32,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            start_time: None,
            continuous: false,
            recent: Some(SUMMARY_RECENT_SECS),
            block_size: PROCESS_BLOCK_SIZE,
        }
    }
}

pub struct CurrencyPostprocessor<'a> {
    db: &'a Database,
    options: ProcessorOptions,
    /// Per-pass snapshot of the dynamic alias vocabulary
    aliases: AliasMap,
}

impl<'a> CurrencyPostprocessor<'a> {
    pub fn new(db: &'a Database, options: ProcessorOptions) -> Self {
        Self {
            db,
            options,
            aliases: AliasMap::empty(),
        }
    }

    /// Process all of the currency data we've seen to date
    ///
    /// In continuous mode, keeps passing until the shutdown flag is set;
    /// a pass that ends on the same last sale as the previous one sleeps
    /// briefly first.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        let mut prev: Option<i64> = None;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Get all known currency names
            self.aliases = AliasMap::from_names(self.db.distinct_from_currencies()?);
            logger::debug(
                LogTag::Currency,
                &format!("Mapping of currencies: {} entries", self.aliases.len())
            );

            // Track what the most recently processed transaction was
            let start = match self.options.start_time {
                Some(start) => Some(start),
                None => self.db.last_processed_item_time()?,
            };
            match start {
                Some(start) => logger::info(
                    LogTag::Currency,
                    &format!("Starting from {}", format_unix(start))
                ),
                None => logger::info(LogTag::Currency, "Starting from beginning of item data."),
            }

            // Actually process all outstanding sale records
            let pass = self.single_pass(start, &shutdown);
            let (rows_done, last_row) = match pass {
                Ok(result) => result,
                Err(e) if self.options.continuous => {
                    // The block was rolled back; retry on the next pass
                    logger::error(LogTag::Currency, &format!("Pass failed, will retry: {:#}", e));
                    tokio::time::sleep(Duration::from_secs(IDLE_PASS_SLEEP_SECS)).await;
                    continue;
                }
                Err(e) => {
                    return Err(e);
                }
            };

            if last_row != prev {
                prev = last_row;
                logger::info(LogTag::Currency, &format!("Processed {} rows in a pass", rows_done));
            } else if self.options.continuous {
                tokio::time::sleep(Duration::from_secs(IDLE_PASS_SLEEP_SECS)).await;
            }

            if !self.options.continuous {
                break;
            }
        }

        Ok(())
    }

    /// One pass over the unprocessed items, in ascending
    /// `(updated_at, created_at, id)` order, one transaction per block
    ///
    /// Returns the number of rows seen and the id of the last sale made.
    fn single_pass(
        &self,
        start: Option<i64>,
        shutdown: &AtomicBool
    ) -> DatabaseResult<(u64, Option<i64>)> {
        let mut offset: u64 = 0;
        let mut all_processed: u64 = 0;
        let mut last_row: Option<i64> = None;
        let updater = SummaryUpdater::new(self.db, self.options.recent);

        loop {
            // Cancellation is cooperative, between blocks only
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            self.db.begin_block()?;

            let rows = match self.db.fetch_process_block(start, self.options.block_size, offset) {
                Ok(rows) => rows,
                Err(e) => {
                    let _ = self.db.rollback_block();
                    return Err(e);
                }
            };
            let count = rows.len();

            let mut failure = None;
            for row in &rows {
                logger::trace(LogTag::Currency, &format!("Row in {}", row.item_id));
                match self.process_sale(row, &updater) {
                    Ok(Some(sale_id)) => {
                        last_row = Some(sale_id);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            if let Some(e) = failure {
                let _ = self.db.rollback_block();
                return Err(e);
            }

            self.db.commit_block()?;
            offset += count as u64;
            all_processed += count as u64;

            if count > 0 {
                logger::info(
                    LogTag::Currency,
                    &format!("{} rows in... ({})", offset, rows[count - 1].updated_at)
                );
            }

            if (count as u32) < self.options.block_size {
                break;
            }
        }

        Ok((all_processed, last_row))
    }

    /// Extract a sale from one joined `(item, stash)` row
    ///
    /// Parse and lookup failures degrade to "no sale recorded"; only
    /// database errors propagate, failing the block.
    fn process_sale(
        &self,
        row: &ItemStashRow,
        updater: &SummaryUpdater
    ) -> DatabaseResult<Option<i64>> {
        // Stashes are named with a conventional pricing descriptor and
        // items can have a note in the same format.
        let note_tagged = row.note.as_deref().map_or(false, |n| n.starts_with('~'));
        let stash_tagged = row.stash_name.as_deref().map_or(false, |s| s.starts_with('~'));
        if !note_tagged && !stash_tagged {
            // No sale
            return Ok(None);
        }

        let is_currency = row.is_currency();
        let name = row.sale_name();

        // The price of an item is the item price, with the stash price
        // as a fallback
        let parsed = parse_note(row.note.as_deref(), &self.aliases).or_else(||
            parse_note(row.stash_name.as_deref(), &self.aliases)
        );
        let (price, currency) = match parsed {
            Some(parsed) => parsed,
            None => {
                return Ok(None);
            }
        };
        if price <= 0.0 {
            // No sale
            return Ok(None);
        }

        let sale_id = self.db.upsert_sale(row, &name, is_currency, &currency, price)?;

        let amount_chaos = self.update_currency_pricing(
            updater,
            &name,
            &currency,
            &row.league,
            price,
            row.updated_at,
            is_currency
        )?;

        if let Some(amount_chaos) = amount_chaos {
            logger::debug(
                LogTag::Currency,
                &format!("Found chaos value of {} -> {} {} = {}", name, price, currency, amount_chaos)
            );
            self.db.set_sale_chaos(sale_id, amount_chaos)?;
        }

        Ok(Some(sale_id))
    }

    /// Given a currency sale, update our understanding of what currency
    /// is now worth, and return the value of the sale in Chaos Orbs
    fn update_currency_pricing(
        &self,
        updater: &SummaryUpdater,
        name: &str,
        currency: &str,
        league: &str,
        price: f64,
        sale_time: i64,
        is_currency: bool
    ) -> DatabaseResult<Option<f64>> {
        if is_currency {
            updater.update_currency_summary(name, currency, league, sale_time)?;
        }

        find_value_of(self.db, currency, league, price)
    }
}

/// Render a unix timestamp for log lines
fn format_unix(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}
