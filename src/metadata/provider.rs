//! Trait definition and types for metadata providers.
//!
//! This module defines the [`MetadataProvider`] trait that catalog backends
//! (TMDB today) implement, along with the title, season, and episode records
//! they return.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use episonext_common::MediaKind;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Title metadata
// ---------------------------------------------------------------------------

/// Descriptive metadata for a title, as returned by a provider.
///
/// Records are cached and replaced wholesale on refetch. Episode listings are
/// fetched per season and attached by the enrichment pipeline before the next
/// unit is resolved; a freshly fetched record carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleMetadata {
    /// Provider-specific identifier (e.g. TMDB numeric ID).
    pub provider_id: String,
    /// Display title.
    pub title: String,
    /// Synopsis / overview text.
    pub overview: Option<String>,
    /// Community rating (typically 0.0 - 10.0).
    pub rating: Option<f64>,
    /// Genre labels.
    pub genres: Vec<String>,
    /// Fully-qualified poster URL.
    pub poster_url: Option<String>,
    /// Fully-qualified backdrop URL.
    pub backdrop_url: Option<String>,
    /// Season summaries in the order the provider returned them. Season 0
    /// holds specials.
    pub seasons: Vec<SeasonSummary>,
    /// The next episode the catalog has announced, if any.
    pub next_episode_to_air: Option<Episode>,
    /// Episode listings keyed by season number.
    #[serde(default)]
    pub episodes: BTreeMap<u32, Vec<Episode>>,
}

impl TitleMetadata {
    /// Regular seasons (specials excluded) sorted by season number.
    pub fn ordered_seasons(&self) -> Vec<&SeasonSummary> {
        let mut seasons: Vec<&SeasonSummary> = self
            .seasons
            .iter()
            .filter(|s| s.season_number > 0)
            .collect();
        seasons.sort_by_key(|s| s.season_number);
        seasons
    }

    /// Look up a regular season by number. Season 0 never matches.
    pub fn season(&self, season_number: u32) -> Option<&SeasonSummary> {
        if season_number == 0 {
            return None;
        }
        self.seasons
            .iter()
            .find(|s| s.season_number == season_number)
    }

    /// The first regular season numbered after `season_number`.
    pub fn season_after(&self, season_number: u32) -> Option<&SeasonSummary> {
        self.ordered_seasons()
            .into_iter()
            .find(|s| s.season_number > season_number)
    }

    /// The episode listing attached for a season, if one was fetched.
    pub fn episodes_for(&self, season_number: u32) -> Option<&[Episode]> {
        self.episodes.get(&season_number).map(Vec::as_slice)
    }

    /// Return a copy with the given season listing attached.
    pub fn with_season_episodes(mut self, season_number: u32, episodes: Vec<Episode>) -> Self {
        self.episodes.insert(season_number, episodes);
        self
    }
}

/// Summary of a single season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    /// Season number (0 for specials).
    pub season_number: u32,
    /// Number of episodes the catalog lists for the season.
    pub episode_count: u32,
    /// Season name, e.g. "Season 2".
    pub name: Option<String>,
    /// Season overview text.
    pub overview: Option<String>,
    /// Fully-qualified season poster URL.
    pub poster_url: Option<String>,
}

/// A single episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// The season this episode belongs to.
    pub season_number: u32,
    /// Episode number within the season (1-based).
    pub episode_number: u32,
    /// Episode title.
    pub title: Option<String>,
    /// Episode overview text.
    pub overview: Option<String>,
    /// First air date, when known.
    pub air_date: Option<NaiveDate>,
    /// Fully-qualified still image URL.
    pub still_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that metadata providers implement.
///
/// Each provider wraps a single external catalog. Implementations hold no
/// state beyond transient request handling and are shared across tasks as
/// `Arc<dyn MetadataProvider>`.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has been configured with credentials
    /// and is ready to serve requests.
    fn is_available(&self) -> bool;

    /// Search the catalog for `title` and fetch details for the first
    /// (highest-relevance) match.
    ///
    /// Returns `Ok(None)` when the search has no results. Network and HTTP
    /// failures are returned as errors.
    async fn fetch(&self, title: &str, kind: MediaKind) -> anyhow::Result<Option<TitleMetadata>>;

    /// Fetch the ordered episode listing of one season.
    ///
    /// A season unknown to the catalog yields an empty list.
    async fn fetch_season_episodes(
        &self,
        provider_id: &str,
        season_number: u32,
    ) -> anyhow::Result<Vec<Episode>>;
}
