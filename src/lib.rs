#![allow(warnings)]

//! poefixer: stash feed ingestion and currency economy post-processing
//!
//! Ingests the public stash feed of an online trading game, persists
//! stashes and items, and derives an economy: a currency exchange graph
//! whose edges are weighted, time-decayed means of observed sale offers,
//! from which the per-league chaos value of any priced item can be
//! computed.

pub mod constants;
pub mod currency;
pub mod database;
pub mod ingest;
pub mod logger;
pub mod stash_api;
