mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable consulted when `[tmdb].api_key` is empty.
pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./episonext.toml",
        "~/.config/episonext/config.toml",
        "/etc/episonext/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if config.tmdb.api_key.is_empty() {
        if let Ok(key) = std::env::var(TMDB_API_KEY_ENV) {
            config.tmdb.api_key = key.trim().to_string();
        }
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let enrichment = &config.enrichment;
    if !(0.0..=1.0).contains(&enrichment.completion_threshold) {
        anyhow::bail!(
            "Completion threshold must be between 0 and 1, got {}",
            enrichment.completion_threshold
        );
    }
    if enrichment.cache_expiration_ms == 0 {
        anyhow::bail!("Cache expiration cannot be 0");
    }
    if enrichment.cleanup_interval_ms == 0 {
        anyhow::bail!("Cache cleanup interval cannot be 0");
    }
    if enrichment.max_concurrency == 0 {
        anyhow::bail!("Enrichment concurrency cannot be 0");
    }
    if enrichment.fetch_timeout_secs == 0 {
        anyhow::bail!("Fetch timeout cannot be 0");
    }

    if config.tmdb.requests_per_second == 0 {
        anyhow::bail!("TMDB requests per second cannot be 0");
    }
    if config.tmdb.request_timeout_secs == 0 {
        anyhow::bail!("TMDB request timeout cannot be 0");
    }
    if config.tmdb.api_key.is_empty() {
        tracing::warn!(
            "No TMDB API key configured (set [tmdb].api_key or {}); items will not be enriched",
            TMDB_API_KEY_ENV
        );
    }

    if config.monitor.polling_interval_secs == 0 {
        anyhow::bail!("Monitor polling interval cannot be 0");
    }
    if config.monitor.pass_timeout_secs == 0 {
        anyhow::bail!("Monitor pass timeout cannot be 0");
    }

    Ok(())
}
