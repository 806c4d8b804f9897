//! Integration tests for batch enrichment.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{pipeline, pipeline_with, series_item, StubCatalog};
use episonext::metadata::{EnrichmentSettings, NextUnit};
use episonext::watchlist::{EnrichedItem, WatchItem};
use episonext_common::SuggestedAction;

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mid_episode_continues_watching() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9), (2, 10)]);

    let out = pipeline(catalog)
        .enrich(&[series_item("tt11280740", "Severance", 1, 4, 0.35)])
        .await;

    assert_eq!(out[0].suggested_action, Some(SuggestedAction::ContinueWatching));
    assert_matches!(&out[0].next_episode, Some(NextUnit::Continuing(pos)) if pos.episode_number == 4);
    let meta = out[0].metadata.as_ref().unwrap();
    assert_eq!(meta.title, "Severance");
    assert_eq!(meta.genres, vec!["Drama".to_string()]);
}

#[tokio::test]
async fn finished_episode_suggests_next() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);

    let out = pipeline(catalog)
        .enrich(&[series_item("tt11280740", "Severance", 1, 4, 0.92)])
        .await;

    assert_eq!(out[0].suggested_action, Some(SuggestedAction::WatchNextEpisode));
    let NextUnit::Next(next) = out[0].next_episode.clone().unwrap() else {
        panic!("expected next episode");
    };
    assert_eq!((next.season_number, next.episode_number), (1, 5));
    assert_eq!(next.title.as_deref(), Some("S1E5"));
}

#[tokio::test]
async fn season_finale_rolls_over() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(0, 2), (1, 9), (2, 10)]);

    let out = pipeline(catalog)
        .enrich(&[series_item("tt11280740", "Severance", 1, 9, 1.0)])
        .await;

    let next = out[0].next_episode.as_ref().unwrap();
    assert_eq!((next.season_number(), next.episode_number()), (2, 1));
    assert_eq!(next.title(), Some("S2E1"));
}

#[tokio::test]
async fn season_finale_without_next_listing_uses_season_summary() {
    let catalog = StubCatalog::new();
    catalog.add_series_with_listings("Severance", "95396", &[(1, 9), (2, 10)], &[(1, 9)]);

    let out = pipeline(catalog)
        .enrich(&[series_item("tt11280740", "Severance", 1, 9, 1.0)])
        .await;

    let NextUnit::Next(next) = out[0].next_episode.clone().unwrap() else {
        panic!("expected next episode");
    };
    assert_eq!(next.title.as_deref(), Some("Season 2 Episode 1"));
    assert_eq!(next.overview.as_deref(), Some("Season 2 of Severance"));
    assert_eq!(next.still_url.as_deref(), Some("https://img.test/95396/s2.jpg"));
}

#[tokio::test]
async fn series_finale_is_finished() {
    let catalog = StubCatalog::new();
    catalog.add_series("Chernobyl", "87108", &[(1, 5)]);

    let out = pipeline(catalog)
        .enrich(&[series_item("tt7366338", "Chernobyl", 1, 5, 0.97)])
        .await;

    assert_eq!(out[0].suggested_action, Some(SuggestedAction::FinishedSeries));
    assert!(out[0].next_episode.is_none());
}

#[tokio::test]
async fn unknown_season_is_finished_once_watched() {
    let catalog = StubCatalog::new();
    catalog.add_series("Chernobyl", "87108", &[(1, 5)]);
    let pipeline = pipeline(catalog);

    let out = pipeline
        .enrich(&[
            series_item("tt7366338", "Chernobyl", 4, 1, 0.2),
            series_item("tt7366338", "Chernobyl", 4, 1, 0.95),
        ])
        .await;

    // Unfinished episodes never look ahead
    assert!(out[0].next_episode.as_ref().unwrap().is_continuing());
    assert_eq!(out[0].suggested_action, Some(SuggestedAction::ContinueWatching));
    assert!(out[1].next_episode.is_none());
    assert_eq!(out[1].suggested_action, Some(SuggestedAction::FinishedSeries));
}

// ---------------------------------------------------------------------------
// Batch behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn order_and_pass_through_preserved() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);

    let movie = WatchItem::movie("tt0113277", "Heat", 0.5);
    let items = vec![
        movie.clone(),
        series_item("tt11280740", "Severance", 1, 1, 0.1),
        series_item("tt0000001", "No Such Show", 1, 1, 0.1),
    ];

    let out = pipeline(catalog.clone()).enrich(&items).await;

    assert_eq!(out.len(), 3);
    assert_eq!(out[0], EnrichedItem::pass_through(movie));
    assert!(out[1].is_enriched());
    assert_eq!(out[2], EnrichedItem::pass_through(items[2].clone()));
    // Movies never reach the catalog
    assert_eq!(catalog.title_calls(), 2);
}

#[tokio::test]
async fn failing_item_does_not_affect_batch() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);
    catalog.add_series("Andor", "83867", &[(1, 12)]);
    catalog.fail_title("Andor");

    let items = vec![
        series_item("tt9253284", "Andor", 1, 3, 0.5),
        series_item("tt11280740", "Severance", 1, 3, 0.5),
    ];
    let report = pipeline(catalog).enrich_with_report(&items).await;

    assert_eq!(report.items[0], EnrichedItem::pass_through(items[0].clone()));
    assert!(report.items[1].is_enriched());
    assert_eq!(report.enriched, 1);
    assert_eq!(report.upstream_failures, 1);
    assert!(!report.catalog_unreachable());
}

#[tokio::test]
async fn panicking_item_is_isolated() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);
    catalog.add_series("Andor", "83867", &[(1, 12)]);
    catalog.panic_on("Andor");

    let items = vec![
        series_item("tt9253284", "Andor", 1, 3, 0.5),
        series_item("tt11280740", "Severance", 1, 3, 0.5),
    ];
    let out = pipeline(catalog).enrich(&items).await;

    assert!(!out[0].is_enriched());
    assert!(out[1].is_enriched());
}

#[tokio::test(start_paused = true)]
async fn slow_lookup_times_out() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);
    catalog.add_series("Andor", "83867", &[(1, 12)]);
    catalog.delay_title("Andor", Duration::from_secs(3600));

    let settings = EnrichmentSettings {
        fetch_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let items = vec![
        series_item("tt9253284", "Andor", 1, 3, 0.5),
        series_item("tt11280740", "Severance", 1, 3, 0.5),
    ];
    let report = pipeline_with(catalog, settings).enrich_with_report(&items).await;

    assert!(!report.items[0].is_enriched());
    assert!(report.items[1].is_enriched());
    assert_eq!(report.upstream_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded() {
    let catalog = StubCatalog::new();
    let mut items = Vec::new();
    for i in 0..10 {
        let title = format!("Show {i}");
        catalog.add_series(&title, &i.to_string(), &[(1, 5)]);
        catalog.delay_title(&title, Duration::from_millis(100));
        items.push(series_item(&format!("tt{i}"), &title, 1, 1, 0.2));
    }

    let settings = EnrichmentSettings {
        max_concurrency: 3,
        ..Default::default()
    };
    let out = pipeline_with(catalog.clone(), settings).enrich(&items).await;

    assert_eq!(out.len(), 10);
    assert!(out.iter().all(EnrichedItem::is_enriched));
    let peak = catalog.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency was {peak}");
}

#[tokio::test]
async fn unavailable_provider_passes_everything_through() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);
    catalog.set_available(false);

    let items = vec![series_item("tt11280740", "Severance", 1, 3, 0.5)];
    let out = pipeline(catalog.clone()).enrich(&items).await;

    assert_eq!(out[0], EnrichedItem::pass_through(items[0].clone()));
    assert_eq!(catalog.title_calls(), 0);
}

#[tokio::test]
async fn empty_batch_returns_empty() {
    let out = pipeline(StubCatalog::new()).enrich(&[]).await;
    assert!(out.is_empty());
}

// ---------------------------------------------------------------------------
// Caching
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_enrichment_is_idempotent_and_cached() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9), (2, 10)]);
    let pipeline = pipeline(catalog.clone());

    let items = vec![
        series_item("tt11280740", "Severance", 1, 9, 1.0),
        WatchItem::movie("tt0113277", "Heat", 0.5),
    ];
    let first = pipeline.enrich(&items).await;
    let calls_after_first = (catalog.title_calls(), catalog.season_calls());
    let second = pipeline.enrich(&items).await;

    assert_eq!(first, second);
    assert_eq!((catalog.title_calls(), catalog.season_calls()), calls_after_first);
}

#[tokio::test]
async fn expired_entries_are_refetched() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);
    let settings = EnrichmentSettings {
        cache_expiration: Duration::ZERO,
        ..Default::default()
    };
    let pipeline = pipeline_with(catalog.clone(), settings);

    let items = vec![series_item("tt11280740", "Severance", 1, 3, 0.5)];
    pipeline.enrich(&items).await;
    pipeline.enrich(&items).await;

    assert_eq!(catalog.title_calls(), 2);
}

#[tokio::test]
async fn failed_lookup_is_not_cached() {
    let catalog = StubCatalog::new();
    catalog.add_series("Severance", "95396", &[(1, 9)]);
    catalog.fail_title("Severance");
    let pipeline = pipeline(catalog.clone());

    let items = vec![series_item("tt11280740", "Severance", 1, 3, 0.5)];
    assert!(!pipeline.enrich(&items).await[0].is_enriched());

    catalog.recover_all();
    assert!(pipeline.enrich(&items).await[0].is_enriched());
}
