//! Watch-list items and their enriched form.
//!
//! A [`WatchItem`] is one entry of a continue-watching list as the host
//! application reports it. The enrichment pipeline turns each into an
//! [`EnrichedItem`] that carries everything from the input plus display
//! metadata, the next unit, and a suggested action.

use episonext_common::{MediaKind, Result, SeriesId, SuggestedAction};
use serde::{Deserialize, Serialize};

use crate::metadata::provider::{Episode, TitleMetadata};
use crate::metadata::resolver::NextUnit;

/// One entry of a viewer's continue-watching list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchItem {
    /// Composite key; the segment before the first `:` is the series id.
    pub id: String,
    /// Title used for the catalog search.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Fraction of the current episode watched, in `[0, 1]`.
    #[serde(default)]
    pub progress: f64,
}

impl WatchItem {
    /// Build a series entry.
    pub fn series(
        id: impl Into<String>,
        name: impl Into<String>,
        season: u32,
        episode: u32,
        progress: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: MediaKind::Series,
            season: Some(season),
            episode: Some(episode),
            progress,
        }
    }

    /// Build a movie entry.
    pub fn movie(id: impl Into<String>, name: impl Into<String>, progress: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: MediaKind::Movie,
            season: None,
            episode: None,
            progress,
        }
    }

    /// Return a copy with a different progress value.
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    /// The series identifier taken from [`id`](Self::id).
    pub fn series_id(&self) -> Result<SeriesId> {
        SeriesId::from_item_key(&self.id)
    }

    /// Season and episode, when both are present.
    pub fn position(&self) -> Option<(u32, u32)> {
        Some((self.season?, self.episode?))
    }

    /// Progress clamped into `[0, 1]`; non-finite values count as unwatched.
    pub fn progress_fraction(&self) -> f64 {
        if self.progress.is_finite() {
            self.progress.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Display fields copied from the catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// The next episode the catalog has announced for the series.
    pub upcoming_episode: Option<Episode>,
}

impl From<&TitleMetadata> for DisplayMetadata {
    fn from(meta: &TitleMetadata) -> Self {
        Self {
            title: meta.title.clone(),
            overview: meta.overview.clone(),
            poster_url: meta.poster_url.clone(),
            backdrop_url: meta.backdrop_url.clone(),
            rating: meta.rating,
            genres: meta.genres.clone(),
            upcoming_episode: meta.next_episode_to_air.clone(),
        }
    }
}

/// A watch item plus what enrichment learned about it.
///
/// Items that could not be enriched (non-series, invalid, or upstream
/// failure) pass through with every added field absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: WatchItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DisplayMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_episode: Option<NextUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<SuggestedAction>,
}

impl EnrichedItem {
    /// Wrap an item unchanged.
    pub fn pass_through(item: WatchItem) -> Self {
        Self {
            item,
            metadata: None,
            next_episode: None,
            suggested_action: None,
        }
    }

    /// Whether enrichment produced a recommendation for this item.
    pub fn is_enriched(&self) -> bool {
        self.suggested_action.is_some()
    }
}
