//! Currency post-processing
//!
//! Everything that turns raw stash/item rows into the sales ledger and
//! the weighted exchange graph: the price-note grammar and alias tables,
//! the note parser, the summary statistics, the valuation search and the
//! driver that paginates over unprocessed items.

pub mod names;
pub mod parser;
pub mod processor;
pub mod summary;
pub mod valuation;

pub use parser::{ parse_note, AliasMap };
pub use processor::{ CurrencyPostprocessor, ProcessorOptions };
pub use summary::{ SummaryUpdater, WeightedStats };
pub use valuation::find_value_of;
