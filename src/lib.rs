//! Episonext - next-episode recommendations for continue-watching lists
//!
//! This library crate exposes the enrichment pipeline, the background
//! monitor, and their supporting types for embedding and integration testing.

pub mod config;
pub mod events;
pub mod metadata;
pub mod monitor;
pub mod watchlist;
