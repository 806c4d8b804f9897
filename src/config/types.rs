use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::metadata::enrichment::EnrichmentSettings;
use crate::metadata::providers::tmdb::{TMDB_BASE_URL, TMDB_IMAGE_BASE};
use crate::monitor::MonitorSettings;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tmdb: TmdbConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    /// TMDB v3 API key. Falls back to the `TMDB_API_KEY` environment variable
    /// when empty.
    #[serde(default)]
    pub api_key: String,

    /// ISO-639-1 language tag sent with every request
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_language() -> String {
    "en-US".to_string()
}
fn default_base_url() -> String {
    TMDB_BASE_URL.to_string()
}
fn default_image_base_url() -> String {
    TMDB_IMAGE_BASE.to_string()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_requests_per_second() -> u32 {
    4
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: default_language(),
            base_url: default_base_url(),
            image_base_url: default_image_base_url(),
            request_timeout_secs: default_request_timeout(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    /// How long catalog responses stay fresh (default: 24 hours)
    #[serde(default = "default_cache_expiration")]
    pub cache_expiration_ms: u64,

    /// Minimum spacing between cache sweeps (default: 1 hour)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_ms: u64,

    /// Progress at or above which an episode counts as watched
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold: f64,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Deadline for each catalog call
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_cache_expiration() -> u64 {
    24 * 60 * 60 * 1000
}
fn default_cleanup_interval() -> u64 {
    60 * 60 * 1000
}
fn default_completion_threshold() -> f64 {
    0.9
}
fn default_max_concurrency() -> usize {
    4
}
fn default_fetch_timeout() -> u64 {
    10
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            cache_expiration_ms: default_cache_expiration(),
            cleanup_interval_ms: default_cleanup_interval(),
            completion_threshold: default_completion_threshold(),
            max_concurrency: default_max_concurrency(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl EnrichmentConfig {
    pub fn settings(&self) -> EnrichmentSettings {
        EnrichmentSettings {
            completion_threshold: self.completion_threshold,
            max_concurrency: self.max_concurrency,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            cache_expiration: Duration::from_millis(self.cache_expiration_ms),
            cleanup_interval: Duration::from_millis(self.cleanup_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Seconds between monitoring passes (default: 5 minutes)
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Window for upcoming-episode announcements
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,

    /// Deadline for a whole pass
    #[serde(default = "default_pass_timeout")]
    pub pass_timeout_secs: u64,
}

fn default_polling_interval() -> u64 {
    300
}
fn default_lookahead_days() -> u32 {
    30
}
fn default_pass_timeout() -> u64 {
    120
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            polling_interval_secs: default_polling_interval(),
            lookahead_days: default_lookahead_days(),
            pass_timeout_secs: default_pass_timeout(),
        }
    }
}

impl MonitorConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            lookahead_days: self.lookahead_days,
            pass_timeout: Duration::from_secs(self.pass_timeout_secs),
        }
    }
}
