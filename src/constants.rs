/// Global constants used across the fixer
///
/// This module contains system-wide constants that are not configurable
/// and are used across multiple modules.

// ============================================================================
// STASH FEED API
// ============================================================================

/// Public stash tab API endpoint
pub const STASH_API_ENDPOINT: &str = "http://www.pathofexile.com/api/public-stash-tabs";

/// Minimum spacing between feed requests, in milliseconds
pub const API_RATE_LIMIT_MS: u64 = 1100;

/// Maximum retry attempts for a failing feed request
pub const API_MAX_RETRIES: u32 = 10;

/// Base delay for exponential retry backoff, in milliseconds
pub const API_BACKOFF_BASE_MS: u64 = 1000;

// ============================================================================
// CURRENCY POST-PROCESSOR TUNING
// ============================================================================

/// The numeraire all values are expressed in
pub const CHAOS_ORB: &str = "Chaos Orb";

/// Sales older than this are ignored for summary statistics (15 days)
pub const RELEVANCE_WINDOW_SECS: i64 = 15 * 24 * 60 * 60;

/// Weight increment: a half-day in seconds. A sale observed `dt` seconds
/// before the current one contributes weight `WEIGHT_INCREMENT_SECS / max(1, dt)`.
pub const WEIGHT_INCREMENT_SECS: i64 = 12 * 60 * 60;

/// Default caching horizon: an existing summary with at least
/// `SUMMARY_CACHE_MIN_COUNT` rows updated within this many seconds is
/// not recomputed
pub const SUMMARY_RECENT_SECS: i64 = 600;

/// Row count at which a summary becomes eligible for caching
pub const SUMMARY_CACHE_MIN_COUNT: i64 = 10;

/// Number of item rows fetched per driver block
pub const PROCESS_BLOCK_SIZE: u32 = 1000;

/// Seconds slept between continuous-mode passes that made no progress
pub const IDLE_PASS_SLEEP_SECS: u64 = 1;
