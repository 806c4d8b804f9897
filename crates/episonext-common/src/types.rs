//! Core type definitions for watch items and recommendations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of media a watch item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Episodic content with seasons and episodes.
    Series,
    /// A single film.
    Movie,
    /// Anything else (channels, events, unknown types).
    #[serde(other)]
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Series => write!(f, "series"),
            Self::Movie => write!(f, "movie"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "series" | "tv" => Ok(Self::Series),
            "movie" => Ok(Self::Movie),
            "other" => Ok(Self::Other),
            _ => Err(Error::invalid_input(format!("Unknown media kind: {s}"))),
        }
    }
}

/// The recommendation surfaced for a watch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedAction {
    /// The current episode is not finished yet.
    ContinueWatching,
    /// The current episode is finished and another one follows.
    WatchNextEpisode,
    /// No further season or episode is known.
    FinishedSeries,
}

impl fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContinueWatching => write!(f, "CONTINUE_WATCHING"),
            Self::WatchNextEpisode => write!(f, "WATCH_NEXT_EPISODE"),
            Self::FinishedSeries => write!(f, "FINISHED_SERIES"),
        }
    }
}
