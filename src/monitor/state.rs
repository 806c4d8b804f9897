//! Per-series snapshots and the diff that turns consecutive passes into
//! events.

use std::collections::{HashMap, HashSet};

use chrono::{Days, NaiveDate};
use episonext_common::{SeriesId, SuggestedAction};

use crate::events::{EpisodeNotice, EventPayload};
use crate::metadata::resolver::{EpisodePosition, NextUnit};
use crate::watchlist::EnrichedItem;

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    action: SuggestedAction,
    next_unit: Option<EpisodePosition>,
}

/// What the monitor remembers between passes.
///
/// There is one snapshot per series. When a pass holds several items of the
/// same series, the furthest-along one speaks for it.
///
/// Only enriched items update a snapshot; an item that passed through
/// unchanged (for example after a catalog outage) leaves the previous
/// snapshot in place so the next successful pass is diffed against it.
#[derive(Debug, Default)]
pub struct MonitorState {
    snapshots: HashMap<SeriesId, Snapshot>,
    announced: HashSet<(SeriesId, u32, u32)>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pass and return the events it produces.
    ///
    /// `nextEpisodeAvailable` fires when a series moves into
    /// [`SuggestedAction::WatchNextEpisode`] or its next unit changes while
    /// staying there. `upcomingEpisode` fires once per episode airing between
    /// `today` and `today + lookahead_days` inclusive.
    pub fn observe(
        &mut self,
        items: &[EnrichedItem],
        today: NaiveDate,
        lookahead_days: u32,
    ) -> Vec<EventPayload> {
        let horizon = today
            .checked_add_days(Days::new(u64::from(lookahead_days)))
            .unwrap_or(NaiveDate::MAX);
        let mut events = Vec::new();

        for (series_id, enriched) in furthest_per_series(items) {
            let Some(action) = enriched.suggested_action else {
                continue;
            };
            let series_name = series_name(enriched);

            for notice in upcoming_candidates(enriched, &series_id, &series_name) {
                let Some(air_date) = notice.air_date else {
                    continue;
                };
                if air_date < today || air_date > horizon {
                    continue;
                }
                let key = (series_id.clone(), notice.season_number, notice.episode_number);
                if self.announced.insert(key) {
                    events.push(EventPayload::UpcomingEpisode(notice));
                }
            }

            let current = Snapshot {
                action,
                next_unit: enriched.next_episode.as_ref().map(NextUnit::position),
            };
            let prior = self.snapshots.insert(series_id.clone(), current.clone());

            if action == SuggestedAction::WatchNextEpisode && prior.as_ref() != Some(&current) {
                if let Some(next) = &enriched.next_episode {
                    events.push(EventPayload::NextEpisodeAvailable(EpisodeNotice {
                        series_id: series_id.clone(),
                        series_name: series_name.clone(),
                        season_number: next.season_number(),
                        episode_number: next.episode_number(),
                        episode_title: next.title().map(str::to_string),
                        air_date: next.air_date(),
                    }));
                }
            }
        }

        events
    }

    /// The last recorded action for a series.
    pub fn action_for(&self, series_id: &SeriesId) -> Option<SuggestedAction> {
        self.snapshots.get(series_id).map(|s| s.action)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Forget every snapshot and announcement.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.announced.clear();
    }
}

/// Enriched items reduced to one per series, in order of each series' first
/// appearance. Among items of one series the latest position wins, then the
/// highest progress.
fn furthest_per_series(items: &[EnrichedItem]) -> Vec<(SeriesId, &EnrichedItem)> {
    let mut chosen: Vec<(SeriesId, &EnrichedItem)> = Vec::new();
    let mut index: HashMap<SeriesId, usize> = HashMap::new();

    for enriched in items.iter().filter(|e| e.suggested_action.is_some()) {
        let Ok(series_id) = enriched.item.series_id() else {
            continue;
        };
        match index.get(&series_id) {
            Some(&slot) => {
                if progress_key(enriched) > progress_key(chosen[slot].1) {
                    chosen[slot].1 = enriched;
                }
            }
            None => {
                index.insert(series_id.clone(), chosen.len());
                chosen.push((series_id, enriched));
            }
        }
    }
    chosen
}

fn progress_key(enriched: &EnrichedItem) -> (u32, u32, f64) {
    let (season, episode) = enriched.item.position().unwrap_or((0, 0));
    (season, episode, enriched.item.progress_fraction())
}

fn series_name(enriched: &EnrichedItem) -> String {
    enriched
        .metadata
        .as_ref()
        .map(|m| m.title.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| enriched.item.name.clone())
}

/// Episodes of this item that could be announced as upcoming: the catalog's
/// next-to-air episode and a not-yet-aired next unit.
fn upcoming_candidates(
    enriched: &EnrichedItem,
    series_id: &SeriesId,
    series_name: &str,
) -> Vec<EpisodeNotice> {
    let mut candidates = Vec::new();

    if let Some(ep) = enriched
        .metadata
        .as_ref()
        .and_then(|m| m.upcoming_episode.as_ref())
    {
        candidates.push(EpisodeNotice {
            series_id: series_id.clone(),
            series_name: series_name.to_string(),
            season_number: ep.season_number,
            episode_number: ep.episode_number,
            episode_title: ep.title.clone(),
            air_date: ep.air_date,
        });
    }

    if let Some(NextUnit::Next(next)) = &enriched.next_episode {
        candidates.push(EpisodeNotice {
            series_id: series_id.clone(),
            series_name: series_name.to_string(),
            season_number: next.season_number,
            episode_number: next.episode_number,
            episode_title: next.title.clone(),
            air_date: next.air_date,
        });
    }

    candidates
}
