//! Enrichment pipeline for continue-watching lists.
//!
//! The [`EnrichmentPipeline`] takes a batch of [`WatchItem`]s and, for each
//! series entry, looks the title up in the catalog, attaches the episode
//! listings the resolver needs, resolves the next unit, and classifies the
//! suggested action. Catalog responses are cached in-process.
//!
//! Failures never escape a batch: an item whose lookup fails, times out, or
//! panics is returned unchanged while the rest of the batch is enriched.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{FutureExt, StreamExt};
use tracing::{debug, error, info, warn};

use episonext_common::MediaKind;

use super::cache::{
    MetadataCache, SeasonKey, TitleKey, DEFAULT_CLEANUP_INTERVAL, DEFAULT_EXPIRATION,
};
use super::classifier::{self, DEFAULT_COMPLETION_THRESHOLD};
use super::provider::{Episode, MetadataProvider, TitleMetadata};
use super::resolver;
use crate::watchlist::{DisplayMetadata, EnrichedItem, WatchItem};

/// Default number of items enriched concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default deadline for a single catalog call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for [`EnrichmentPipeline`].
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// Progress at or above which an episode counts as watched.
    pub completion_threshold: f64,
    /// Upper bound on items processed at once within a batch.
    pub max_concurrency: usize,
    /// Deadline applied to each catalog call.
    pub fetch_timeout: Duration,
    /// Lifetime of cached catalog responses.
    pub cache_expiration: Duration,
    /// Minimum spacing between cache sweeps.
    pub cleanup_interval: Duration,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache_expiration: DEFAULT_EXPIRATION,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Why a single item was not enriched.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("invalid watch item: {0}")]
    InvalidItem(#[from] episonext_common::Error),

    #[error("catalog lookup failed: {0:#}")]
    Upstream(anyhow::Error),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("no catalog match for {0:?}")]
    NoMatch(String),

    #[error("enrichment panicked: {0}")]
    Panicked(String),
}

impl EnrichError {
    /// Whether the catalog (rather than the input) is to blame.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Timeout { .. })
    }
}

/// Result of enriching one batch, with counters for callers that need to
/// tell a degraded catalog from an ordinary batch.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    /// Output items, in input order.
    pub items: Vec<EnrichedItem>,
    /// Items that received a suggested action.
    pub enriched: usize,
    /// Items returned unchanged for any reason.
    pub passed_through: usize,
    /// Series items that reached a catalog lookup.
    pub lookups: usize,
    /// Lookups that failed because of the catalog (error status, network, timeout).
    pub upstream_failures: usize,
}

impl EnrichmentReport {
    /// True when there were lookups and every one of them failed upstream.
    pub fn catalog_unreachable(&self) -> bool {
        self.lookups > 0 && self.upstream_failures == self.lookups
    }
}

enum Outcome {
    Enriched,
    Skipped,
    Failed(EnrichError),
}

/// Enriches watch-list batches against a metadata provider.
pub struct EnrichmentPipeline {
    provider: Arc<dyn MetadataProvider>,
    titles: MetadataCache<TitleKey, Arc<TitleMetadata>>,
    seasons: MetadataCache<SeasonKey, Arc<Vec<Episode>>>,
    settings: EnrichmentSettings,
}

impl EnrichmentPipeline {
    /// Create a pipeline with default settings.
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self::with_settings(provider, EnrichmentSettings::default())
    }

    pub fn with_settings(provider: Arc<dyn MetadataProvider>, settings: EnrichmentSettings) -> Self {
        Self {
            provider,
            titles: MetadataCache::new(settings.cache_expiration, settings.cleanup_interval),
            seasons: MetadataCache::new(settings.cache_expiration, settings.cleanup_interval),
            settings,
        }
    }

    pub fn settings(&self) -> &EnrichmentSettings {
        &self.settings
    }

    /// Name of the backing provider.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Whether the backing provider is configured.
    pub fn provider_available(&self) -> bool {
        self.provider.is_available()
    }

    /// Enrich a batch. The output has the same length and order as `items`.
    pub async fn enrich(&self, items: &[WatchItem]) -> Vec<EnrichedItem> {
        self.enrich_with_report(items).await.items
    }

    /// Enrich a batch and report how it went.
    pub async fn enrich_with_report(&self, items: &[WatchItem]) -> EnrichmentReport {
        if items.is_empty() {
            return EnrichmentReport::default();
        }

        let now = Utc::now();
        if let Some(removed) = self.titles.maybe_sweep(now) {
            debug!(removed, remaining = self.titles.len(), "Swept title cache");
        }
        if let Some(removed) = self.seasons.maybe_sweep(now) {
            debug!(removed, remaining = self.seasons.len(), "Swept season cache");
        }

        let available = self.provider.is_available();
        if !available {
            warn!(
                provider = self.provider.name(),
                items = items.len(),
                "Metadata provider is not configured; returning items unchanged"
            );
        }

        // Futures are built up front: a borrowing closure inside the stream
        // keeps the batch future from being `Send`.
        let lookups: Vec<_> = items
            .iter()
            .map(|item| self.enrich_isolated(item, available))
            .collect();

        // `buffered` keeps input order while running up to N items at once
        let outcomes: Vec<(EnrichedItem, Outcome)> = futures::stream::iter(lookups)
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        let mut report = EnrichmentReport {
            items: Vec::with_capacity(outcomes.len()),
            ..Default::default()
        };
        for (item, outcome) in outcomes {
            match outcome {
                Outcome::Enriched => {
                    report.enriched += 1;
                    report.lookups += 1;
                }
                Outcome::Skipped => report.passed_through += 1,
                Outcome::Failed(err) => {
                    report.passed_through += 1;
                    if !matches!(err, EnrichError::InvalidItem(_)) {
                        report.lookups += 1;
                    }
                    if err.is_upstream() {
                        report.upstream_failures += 1;
                    }
                }
            }
            report.items.push(item);
        }

        info!(
            total = report.items.len(),
            enriched = report.enriched,
            passed_through = report.passed_through,
            upstream_failures = report.upstream_failures,
            "Enrichment batch complete"
        );
        report
    }

    /// Enrich one item, converting every failure (panics included) into a
    /// pass-through of the original item.
    async fn enrich_isolated(&self, item: &WatchItem, available: bool) -> (EnrichedItem, Outcome) {
        if !available {
            return (EnrichedItem::pass_through(item.clone()), Outcome::Skipped);
        }

        match AssertUnwindSafe(self.enrich_one(item)).catch_unwind().await {
            Ok(Ok(Some(enriched))) => (enriched, Outcome::Enriched),
            Ok(Ok(None)) => (EnrichedItem::pass_through(item.clone()), Outcome::Skipped),
            Ok(Err(err)) => {
                match &err {
                    EnrichError::NoMatch(_) => {
                        debug!(item_id = %item.id, error = %err, "Passing item through")
                    }
                    _ => warn!(item_id = %item.id, error = %err, "Enrichment failed; passing item through"),
                }
                (EnrichedItem::pass_through(item.clone()), Outcome::Failed(err))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(item_id = %item.id, panic = %message, "Enrichment panicked; passing item through");
                (
                    EnrichedItem::pass_through(item.clone()),
                    Outcome::Failed(EnrichError::Panicked(message)),
                )
            }
        }
    }

    async fn enrich_one(&self, item: &WatchItem) -> Result<Option<EnrichedItem>, EnrichError> {
        // Step 1: Validate the item and decide whether it applies.
        item.series_id()?;
        if item.kind != MediaKind::Series {
            return Ok(None);
        }
        let (season, episode) = item.position().ok_or_else(|| {
            episonext_common::Error::invalid_input(format!(
                "series item {} has no season/episode",
                item.id
            ))
        })?;
        if item.name.trim().is_empty() {
            return Err(episonext_common::Error::invalid_input(format!(
                "series item {} has no title",
                item.id
            ))
            .into());
        }

        // Step 2: Title metadata (cached).
        let metadata = self.title_metadata(&item.name, item.kind).await?;

        // Step 3: Attach the season listings the resolver will consult.
        let progress = item.progress_fraction();
        let threshold = self.settings.completion_threshold;
        let metadata = if progress >= threshold {
            self.attach_listings(metadata, season, episode).await?
        } else {
            metadata
        };

        // Step 4: Resolve and classify.
        let next_episode = resolver::resolve(&metadata, season, episode, progress, threshold);
        let action = classifier::classify(progress, next_episode.as_ref(), threshold);

        debug!(
            item_id = %item.id,
            provider_id = %metadata.provider_id,
            action = %action,
            "Enriched item"
        );

        Ok(Some(EnrichedItem {
            item: item.clone(),
            metadata: Some(DisplayMetadata::from(metadata.as_ref())),
            next_episode,
            suggested_action: Some(action),
        }))
    }

    async fn title_metadata(
        &self,
        title: &str,
        kind: MediaKind,
    ) -> Result<Arc<TitleMetadata>, EnrichError> {
        let key = TitleKey::new(kind, title);
        if let Some(cached) = self.titles.get(&key) {
            debug!(title, "Title cache hit");
            return Ok(cached);
        }

        let fetched = self
            .with_timeout("title lookup", self.provider.fetch(title, kind))
            .await?
            .ok_or_else(|| EnrichError::NoMatch(title.to_string()))?;
        let fetched = Arc::new(fetched);
        self.titles.insert(key, Arc::clone(&fetched));
        Ok(fetched)
    }

    async fn season_episodes(
        &self,
        provider_id: &str,
        season_number: u32,
    ) -> Result<Arc<Vec<Episode>>, EnrichError> {
        let key = SeasonKey::new(provider_id, season_number);
        if let Some(cached) = self.seasons.get(&key) {
            return Ok(cached);
        }

        let episodes = self
            .with_timeout(
                "season lookup",
                self.provider.fetch_season_episodes(provider_id, season_number),
            )
            .await?;
        let episodes = Arc::new(episodes);
        self.seasons.insert(key, Arc::clone(&episodes));
        Ok(episodes)
    }

    /// Return a view of `metadata` with the current season's listing attached,
    /// plus the next season's when the viewer is at the end of the current one.
    ///
    /// A failed current-season lookup fails the item. A failed next-season
    /// lookup only loses the listing; the resolver then falls back to the
    /// season summary.
    async fn attach_listings(
        &self,
        metadata: Arc<TitleMetadata>,
        season: u32,
        episode: u32,
    ) -> Result<Arc<TitleMetadata>, EnrichError> {
        if metadata.season(season).is_none() {
            return Ok(metadata);
        }

        let current = self.season_episodes(&metadata.provider_id, season).await?;
        let mut view = (*metadata).clone();

        for number in resolver::seasons_needed(&metadata, season, episode, Some(current.len())) {
            if number == season {
                continue;
            }
            match self.season_episodes(&metadata.provider_id, number).await {
                Ok(listing) => {
                    view.episodes.insert(number, listing.as_ref().clone());
                }
                Err(err) => debug!(
                    provider_id = %metadata.provider_id,
                    season = number,
                    error = %err,
                    "Next season listing unavailable; using season summary"
                ),
            }
        }
        view.episodes.insert(season, current.as_ref().clone());
        Ok(Arc::new(view))
    }

    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<T, EnrichError> {
        let timeout = self.settings.fetch_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(EnrichError::Upstream(err)),
            Err(_) => Err(EnrichError::Timeout { operation, timeout }),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
