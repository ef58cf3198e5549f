//! Public stash feed interface
//!
//! Tolerant decoding of the upstream feed plus the rate-limited,
//! retry-aware HTTP client that pages through it.

pub mod client;
pub mod types;

pub use client::StashClient;
pub use types::{ ApiItem, ApiStash, StashApiError, StashApiResult, StashTabsPage };
