//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] by querying the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting (4 requests / second by default) via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - Per-request timeout (10 seconds by default).
//! - First search result wins; TMDB already orders results by relevance.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use episonext_common::MediaKind;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TmdbConfig;
use crate::metadata::provider::{Episode, MetadataProvider, SeasonSummary, TitleMetadata};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUESTS_PER_SECOND: u32 = 4;
const MAX_RETRIES: u32 = 3;

const POSTER_SIZE: &str = "w500";
const ORIGINAL_SIZE: &str = "original";

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct TmdbDetail {
    id: u64,
    /// TV title
    name: Option<String>,
    /// Movie title
    title: Option<String>,
    overview: Option<String>,
    vote_average: Option<f64>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    #[serde(default)]
    seasons: Vec<TmdbSeason>,
    next_episode_to_air: Option<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbSeason {
    season_number: u32,
    #[serde(default)]
    episode_count: u32,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonDetail {
    #[serde(default)]
    episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisode {
    season_number: u32,
    episode_number: u32,
    name: Option<String>,
    overview: Option<String>,
    air_date: Option<String>,
    still_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// Wraps the TMDB v3 REST API with built-in rate limiting and retry logic.
///
/// # Examples
///
/// ```no_run
/// use episonext::metadata::providers::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into());
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
    image_base_url: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    /// Create a new TMDB provider against the public API.
    ///
    /// The `language` parameter should be an ISO-639-1 language tag such as
    /// `"en-US"`.
    pub fn new(api_key: String, language: String) -> Self {
        Self::build(
            api_key,
            language,
            TMDB_BASE_URL.to_string(),
            TMDB_IMAGE_BASE.to_string(),
            REQUEST_TIMEOUT,
            DEFAULT_REQUESTS_PER_SECOND,
        )
    }

    /// Create a provider from the `[tmdb]` config section.
    pub fn from_config(config: &TmdbConfig) -> Self {
        Self::build(
            config.api_key.clone(),
            config.language.clone(),
            config.base_url.clone(),
            config.image_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            config.requests_per_second,
        )
    }

    fn build(
        api_key: String,
        language: String,
        base_url: String,
        image_base_url: String,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build TMDB HTTP client, using defaults");
                reqwest::Client::new()
            });

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Self {
            client,
            api_key,
            language,
            base_url: base_url.trim_end_matches('/').to_string(),
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        }
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    ///
    /// Returns `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> anyhow::Result<Option<T>> {
        let url = format!("{}{path}", self.base_url);
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                ])
                .query(params)
                .send()
                .await
                .with_context(|| format!("TMDB request failed: {path}"))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    path,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            if resp.status() == StatusCode::NOT_FOUND {
                debug!(path, "TMDB returned 404");
                return Ok(None);
            }

            let body = resp
                .error_for_status()
                .with_context(|| format!("TMDB request returned error: {path}"))?
                .json::<T>()
                .await
                .with_context(|| format!("failed to parse TMDB response: {path}"))?;
            return Ok(Some(body));
        }
    }

    fn image_url(&self, size: &str, path: Option<String>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}/{size}{p}", self.image_base_url))
    }

    fn to_episode(&self, ep: TmdbEpisode) -> Episode {
        Episode {
            season_number: ep.season_number,
            episode_number: ep.episode_number,
            title: ep.name,
            overview: non_empty(ep.overview),
            air_date: parse_air_date(ep.air_date.as_deref()),
            still_url: self.image_url(ORIGINAL_SIZE, ep.still_path),
        }
    }

    fn to_metadata(&self, detail: TmdbDetail) -> TitleMetadata {
        TitleMetadata {
            provider_id: detail.id.to_string(),
            title: detail.name.or(detail.title).unwrap_or_default(),
            overview: non_empty(detail.overview),
            rating: detail.vote_average,
            genres: detail.genres.into_iter().map(|g| g.name).collect(),
            poster_url: self.image_url(POSTER_SIZE, detail.poster_path),
            backdrop_url: self.image_url(ORIGINAL_SIZE, detail.backdrop_path),
            seasons: detail
                .seasons
                .into_iter()
                .map(|s| SeasonSummary {
                    season_number: s.season_number,
                    episode_count: s.episode_count,
                    name: s.name,
                    overview: non_empty(s.overview),
                    poster_url: self.image_url(POSTER_SIZE, s.poster_path),
                })
                .collect(),
            next_episode_to_air: detail.next_episode_to_air.map(|ep| self.to_episode(ep)),
            episodes: Default::default(),
        }
    }
}

/// TMDB path segment for a media kind. Only series and movies are searchable.
fn catalog_segment(kind: MediaKind) -> Option<&'static str> {
    match kind {
        MediaKind::Series => Some("tv"),
        MediaKind::Movie => Some("movie"),
        MediaKind::Other => None,
    }
}

/// Parse a TMDB `YYYY-MM-DD` date. Empty or malformed dates are treated as
/// unknown.
fn parse_air_date(date: Option<&str>) -> Option<NaiveDate> {
    date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch(&self, title: &str, kind: MediaKind) -> anyhow::Result<Option<TitleMetadata>> {
        let Some(segment) = catalog_segment(kind) else {
            debug!(title, %kind, "TMDB has no catalog for this kind");
            return Ok(None);
        };

        debug!(title, kind = segment, "TMDB search");
        let search: Option<TmdbSearchResponse> = self
            .get_json(
                &format!("/search/{segment}"),
                &[("query", title), ("include_adult", "false")],
            )
            .await?;

        let Some(first) = search.and_then(|s| s.results.into_iter().next()) else {
            debug!(title, "TMDB search returned no results");
            return Ok(None);
        };

        debug!(title, tmdb_id = first.id, "TMDB fetching details");
        let detail: Option<TmdbDetail> = self
            .get_json(&format!("/{segment}/{}", first.id), &[])
            .await?;

        Ok(detail.map(|d| self.to_metadata(d)))
    }

    async fn fetch_season_episodes(
        &self,
        provider_id: &str,
        season_number: u32,
    ) -> anyhow::Result<Vec<Episode>> {
        debug!(provider_id, season_number, "TMDB get season");
        let season: Option<TmdbSeasonDetail> = self
            .get_json(&format!("/tv/{provider_id}/season/{season_number}"), &[])
            .await?;

        let mut episodes: Vec<Episode> = season
            .map(|s| s.episodes)
            .unwrap_or_default()
            .into_iter()
            .map(|ep| self.to_episode(ep))
            .collect();
        episodes.sort_by_key(|ep| ep.episode_number);
        Ok(episodes)
    }
}
