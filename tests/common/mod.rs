//! Shared test harness for integration tests.
//!
//! Provides [`StubCatalog`], an in-memory [`MetadataProvider`] whose titles,
//! season listings, failures, and latencies are set up per test, plus small
//! builders for watch items.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use episonext::metadata::{
    EnrichmentPipeline, EnrichmentSettings, Episode, MetadataProvider, SeasonSummary,
    TitleMetadata,
};
use episonext::watchlist::WatchItem;
use episonext_common::MediaKind;

/// In-memory catalog.
#[derive(Default)]
pub struct StubCatalog {
    titles: RwLock<HashMap<String, TitleMetadata>>,
    listings: RwLock<HashMap<(String, u32), Vec<Episode>>>,
    failing: RwLock<HashSet<String>>,
    panicking: RwLock<HashSet<String>>,
    delays: RwLock<HashMap<String, Duration>>,
    unavailable: AtomicBool,
    pub title_calls: AtomicUsize,
    pub season_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StubCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a series with regular seasons given as `(number, episode_count)`.
    /// Every season gets a full listing.
    pub fn add_series(&self, title: &str, provider_id: &str, seasons: &[(u32, u32)]) {
        self.add_series_with_listings(title, provider_id, seasons, seasons);
    }

    /// Register a series where only the seasons in `listed` have listings.
    pub fn add_series_with_listings(
        &self,
        title: &str,
        provider_id: &str,
        seasons: &[(u32, u32)],
        listed: &[(u32, u32)],
    ) {
        let metadata = TitleMetadata {
            provider_id: provider_id.to_string(),
            title: title.to_string(),
            overview: Some(format!("{title} overview")),
            rating: Some(8.0),
            genres: vec!["Drama".to_string()],
            poster_url: Some(format!("https://img.test/{provider_id}/poster.jpg")),
            backdrop_url: None,
            seasons: seasons
                .iter()
                .map(|&(n, count)| SeasonSummary {
                    season_number: n,
                    episode_count: count,
                    name: Some(format!("Season {n}")),
                    overview: Some(format!("Season {n} of {title}")),
                    poster_url: Some(format!("https://img.test/{provider_id}/s{n}.jpg")),
                })
                .collect(),
            next_episode_to_air: None,
            episodes: BTreeMap::new(),
        };
        self.titles.write().insert(title.to_string(), metadata);

        let mut listings = self.listings.write();
        for &(n, count) in listed {
            listings.insert((provider_id.to_string(), n), episodes(n, count));
        }
    }

    /// Announce the next episode to air for a registered title.
    pub fn set_upcoming(&self, title: &str, season: u32, episode: u32, air_date: NaiveDate) {
        if let Some(meta) = self.titles.write().get_mut(title) {
            meta.next_episode_to_air = Some(Episode {
                season_number: season,
                episode_number: episode,
                title: Some(format!("Upcoming S{season}E{episode}")),
                overview: None,
                air_date: Some(air_date),
                still_url: None,
            });
        }
    }

    pub fn fail_title(&self, title: &str) {
        self.failing.write().insert(title.to_string());
    }

    pub fn fail_all(&self) {
        let titles: Vec<String> = self.titles.read().keys().cloned().collect();
        self.failing.write().extend(titles);
    }

    pub fn recover_all(&self) {
        self.failing.write().clear();
    }

    pub fn panic_on(&self, title: &str) {
        self.panicking.write().insert(title.to_string());
    }

    pub fn delay_title(&self, title: &str, delay: Duration) {
        self.delays.write().insert(title.to_string(), delay);
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn title_calls(&self) -> usize {
        self.title_calls.load(Ordering::SeqCst)
    }

    pub fn season_calls(&self) -> usize {
        self.season_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StubCatalog {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn fetch(&self, title: &str, _kind: MediaKind) -> anyhow::Result<Option<TitleMetadata>> {
        self.title_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.read().get(title).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.read().contains(title) {
            panic!("stub catalog exploded on {title}");
        }
        if self.failing.read().contains(title) {
            anyhow::bail!("stub catalog unreachable for {title}");
        }
        Ok(self.titles.read().get(title).cloned())
    }

    async fn fetch_season_episodes(
        &self,
        provider_id: &str,
        season_number: u32,
    ) -> anyhow::Result<Vec<Episode>> {
        self.season_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .listings
            .read()
            .get(&(provider_id.to_string(), season_number))
            .cloned()
            .unwrap_or_default())
    }
}

pub fn episodes(season: u32, count: u32) -> Vec<Episode> {
    (1..=count)
        .map(|n| Episode {
            season_number: season,
            episode_number: n,
            title: Some(format!("S{season}E{n}")),
            overview: Some(format!("Episode {n} of season {season}")),
            air_date: NaiveDate::from_ymd_opt(2020, 1, n.min(28)),
            still_url: None,
        })
        .collect()
}

/// A series watch item keyed `<series_id>:<season>:<episode>`.
pub fn series_item(series_id: &str, title: &str, season: u32, episode: u32, progress: f64) -> WatchItem {
    WatchItem::series(
        format!("{series_id}:{season}:{episode}"),
        title,
        season,
        episode,
        progress,
    )
}

pub fn pipeline(catalog: Arc<StubCatalog>) -> Arc<EnrichmentPipeline> {
    Arc::new(EnrichmentPipeline::new(catalog))
}

pub fn pipeline_with(catalog: Arc<StubCatalog>, settings: EnrichmentSettings) -> Arc<EnrichmentPipeline> {
    Arc::new(EnrichmentPipeline::with_settings(catalog, settings))
}
