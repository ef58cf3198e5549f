//! Database layer for the fixer
//!
//! A thin rusqlite wrapper organized by concern:
//! - Connection management, schema and block transactions
//! - Stash upserts and item invalidation
//! - Item upserts and the processor's pagination query
//! - Sale persistence and bucket history
//! - Currency summary statistics storage
//!
//! ## Usage
//!
//! ```rust
//! use poefixer::database::Database;
//!
//! let db = Database::new(":memory:")?;
//! # anyhow::Ok(())
//! ```

pub mod connection;
pub mod items;
pub mod models;
pub mod sales;
pub mod stashes;
pub mod summaries;

// Re-export the main types for easier access
pub use connection::Database;
pub use models::{
    CurrencySummary,
    DatabaseConfig,
    DatabaseResult,
    ItemStashRow,
    Sale,
    SaleObservation,
};

/// Current unix time in seconds
pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
