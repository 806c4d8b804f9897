//! Catalog metadata and next-episode resolution.
//!
//! # Module layout
//!
//! - [`provider`] -- Provider trait and title/season/episode records.
//! - [`providers`] -- Concrete provider implementations (TMDB).
//! - [`cache`] -- Time-expiring cache for catalog responses.
//! - [`resolver`] -- Works out the next unit to watch.
//! - [`classifier`] -- Maps progress and next unit to a suggested action.
//! - [`enrichment`] -- Batch enrichment pipeline tying the above together.

pub mod cache;
pub mod classifier;
pub mod enrichment;
pub mod provider;
pub mod providers;
pub mod resolver;

pub use enrichment::{EnrichError, EnrichmentPipeline, EnrichmentReport, EnrichmentSettings};
pub use provider::{Episode, MetadataProvider, SeasonSummary, TitleMetadata};
pub use providers::TmdbProvider;
pub use resolver::{EpisodePosition, NextEpisode, NextUnit};
