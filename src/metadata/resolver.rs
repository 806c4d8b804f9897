//! Next-unit resolution.
//!
//! Given a series' metadata and a viewer's position, work out what they
//! should watch next: keep going with the current episode, move to the next
//! episode of the season, roll over into the next season, or nothing at all.
//!
//! Resolution is a pure function over [`TitleMetadata`]. Episode listings must
//! already be attached for the seasons involved; the enrichment pipeline
//! fetches them before calling [`resolve`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::provider::{Episode, SeasonSummary, TitleMetadata};

/// A season/episode pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodePosition {
    pub season_number: u32,
    pub episode_number: u32,
}

/// The episode that follows the viewer's current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub still_url: Option<String>,
    pub air_date: Option<NaiveDate>,
}

impl NextEpisode {
    /// Place a listing entry at `season_number`/`episode_number`. The
    /// position is computed by the resolver; catalog numbering can skip or
    /// start at zero.
    fn from_episode(episode: &Episode, season_number: u32, episode_number: u32) -> Self {
        Self {
            season_number,
            episode_number,
            title: episode.title.clone(),
            overview: episode.overview.clone(),
            still_url: episode.still_url.clone(),
            air_date: episode.air_date,
        }
    }

    /// Synthesized first episode of a season whose listing is unavailable.
    fn season_opener(season: &SeasonSummary) -> Self {
        Self {
            season_number: season.season_number,
            episode_number: 1,
            title: Some(format!("Season {} Episode 1", season.season_number)),
            overview: season.overview.clone(),
            still_url: season.poster_url.clone(),
            air_date: None,
        }
    }
}

/// What to watch next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NextUnit {
    /// The current episode is unfinished; resume it.
    Continuing(EpisodePosition),
    /// The current episode is finished; this one follows.
    Next(NextEpisode),
}

impl NextUnit {
    pub fn is_continuing(&self) -> bool {
        matches!(self, Self::Continuing(_))
    }

    pub fn position(&self) -> EpisodePosition {
        match self {
            Self::Continuing(pos) => *pos,
            Self::Next(next) => EpisodePosition {
                season_number: next.season_number,
                episode_number: next.episode_number,
            },
        }
    }

    pub fn season_number(&self) -> u32 {
        self.position().season_number
    }

    pub fn episode_number(&self) -> u32 {
        self.position().episode_number
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Continuing(_) => None,
            Self::Next(next) => next.title.as_deref(),
        }
    }

    pub fn air_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Continuing(_) => None,
            Self::Next(next) => next.air_date,
        }
    }
}

/// Resolve the next unit for a viewer at `season`/`episode` with the given
/// watch progress.
///
/// An unfinished episode always resolves to [`NextUnit::Continuing`] without
/// looking ahead. Otherwise returns `None` when the current season is unknown,
/// when its episode listing has not been attached, or when the viewer
/// finished the last episode of the last season.
pub fn resolve(
    metadata: &TitleMetadata,
    season: u32,
    episode: u32,
    progress: f64,
    completion_threshold: f64,
) -> Option<NextUnit> {
    if progress < completion_threshold {
        return Some(NextUnit::Continuing(EpisodePosition {
            season_number: season,
            episode_number: episode,
        }));
    }

    metadata.season(season)?;
    let listing = metadata.episodes_for(season)?;
    // Listings are ordered, so the episode after `episode` sits at index `episode`
    if let Some(next) = listing.get(episode as usize) {
        return Some(NextUnit::Next(NextEpisode::from_episode(next, season, episode + 1)));
    }

    let next_season = metadata.season_after(season)?;
    let opener = metadata
        .episodes_for(next_season.season_number)
        .and_then(|episodes| episodes.first())
        .map(|first| NextEpisode::from_episode(first, next_season.season_number, 1))
        .unwrap_or_else(|| NextEpisode::season_opener(next_season));
    Some(NextUnit::Next(opener))
}

/// Season numbers whose listings [`resolve`] will consult for this position.
///
/// The next season is only included when the current listing (if supplied)
/// shows the viewer has reached its end; pass `None` to ask about the current
/// season alone.
pub fn seasons_needed(
    metadata: &TitleMetadata,
    season: u32,
    episode: u32,
    current_listing_len: Option<usize>,
) -> Vec<u32> {
    if metadata.season(season).is_none() {
        return Vec::new();
    }
    let mut needed = vec![season];
    if let Some(len) = current_listing_len {
        if episode as usize >= len {
            if let Some(next) = metadata.season_after(season) {
                needed.push(next.season_number);
            }
        }
    }
    needed
}
