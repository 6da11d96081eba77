//! Integration tests for the shared analytics service
//!
//! These tests run the full request path (validation, storage fetch, name
//! resolution, aggregation and view assembly) against an in-memory SQLite
//! log.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tally::analytics::{
    AnalyticsError, AnalyticsService, ErrorKind, SharedAnalyticsRequest, SponsorAnalyticsRequest,
};
use tally::config::AnalyticsConfig;
use tally::models::{EventRecord, MetricKind, RawMetricEvent, SponsorRecord, Surface};
use tally::storage::{SqliteStorage, Storage, StorageResult};

/// Helper to create test storage
async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn metric(event_id: &str, surface: Surface, metric: MetricKind) -> RawMetricEvent {
    RawMetricEvent::new(Some(event_id), surface, metric)
}

fn organizer(brand_id: &str) -> SharedAnalyticsRequest {
    SharedAnalyticsRequest {
        brand_id: Some(brand_id.to_string()),
        ..Default::default()
    }
}

fn sponsor_request(brand_id: &str, sponsor_id: &str) -> SponsorAnalyticsRequest {
    SponsorAnalyticsRequest {
        brand_id: Some(brand_id.to_string()),
        sponsor_id: Some(sponsor_id.to_string()),
        event_id: None,
    }
}

/// Two events, three sponsors, mixed surfaces, plus one record without an event
async fn seed_gala(storage: &Arc<dyn Storage>) {
    let events = vec![
        metric("E1", Surface::Poster, MetricKind::Impression).with_sponsor("S1"),
        metric("E1", Surface::Poster, MetricKind::Impression).with_sponsor("S1"),
        metric("E1", Surface::Poster, MetricKind::Click).with_sponsor("S1"),
        metric("E1", Surface::Poster, MetricKind::QrScan).with_sponsor("S1"),
        metric("E1", Surface::Display, MetricKind::Impression).with_sponsor("S2"),
        metric("E1", Surface::Display, MetricKind::Impression).with_sponsor("S2"),
        metric("E1", Surface::Display, MetricKind::Impression).with_sponsor("S2"),
        metric("E2", Surface::Public, MetricKind::Impression).with_sponsor("S3"),
        metric("E2", Surface::Public, MetricKind::Click).with_sponsor("S3"),
        metric("E2", Surface::Public, MetricKind::Click).with_sponsor("S3"),
        metric("E2", Surface::Signup, MetricKind::Signup),
        metric("E2", Surface::parse("Kiosk"), MetricKind::Impression),
        RawMetricEvent::new(None, Surface::Poster, MetricKind::Impression).with_sponsor("S1"),
    ];

    storage.append_events("gala", &events).await.unwrap();
}

async fn seed_names(storage: &Arc<dyn Storage>) {
    storage.upsert_sponsor("gala", "S1", "Northwind").await.unwrap();
    storage
        .upsert_event(
            "gala",
            "E1",
            "Spring Gala",
            Some(r#"[{"id":"S1","name":"Shadowed"},{"id":"S2","name":"Contoso"}]"#),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_organizer_view_end_to_end() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;
    seed_names(&storage).await;

    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());
    let view = service.get_shared_analytics(&organizer("gala")).await.unwrap();

    let summary = &view.summary;
    assert_eq!(summary.total_impressions, 7);
    assert_eq!(summary.total_clicks, 3);
    assert_eq!(summary.total_qr_scans, 1);
    assert_eq!(summary.total_signups, 1);
    assert_eq!(summary.unique_events, 2);
    assert_eq!(summary.unique_sponsors, 3);

    let surfaces: Vec<(&str, u64)> = view
        .surfaces
        .iter()
        .map(|s| (s.id.as_str(), s.impressions))
        .collect();
    assert_eq!(
        surfaces,
        vec![("display", 3), ("poster", 2), ("public", 1), ("unknown", 1), ("signup", 0)]
    );
    assert_eq!(view.surfaces[1].engagement_rate, 100.0);
    assert_eq!(view.surfaces[3].label, "Unknown");

    let sponsors = view.sponsors.as_ref().unwrap();
    let names: Vec<(&str, &str)> = sponsors
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("S2", "Contoso"), ("S1", "Northwind"), ("S3", "S3")]
    );
    assert_eq!(sponsors[1].ctr, 50.0);

    let top: Vec<&str> = view
        .top_sponsors
        .as_ref()
        .unwrap()
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(top, vec!["S3", "S1", "S2"]);

    let events = view.events.as_ref().unwrap();
    assert_eq!(events[0].id, "E1");
    assert_eq!(events[0].name, "Spring Gala");
    assert_eq!(events[0].impressions, 5);
    assert_eq!(events[0].ctr, 20.0);
    assert_eq!(events[1].name, "E2");
    assert_eq!(events[1].signups_count, 1);
}

#[tokio::test]
async fn test_sponsor_view_is_computed_from_own_records() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;
    seed_names(&storage).await;

    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());
    let view = service
        .get_sponsor_analytics(&sponsor_request("gala", "S1"))
        .await
        .unwrap();

    assert!(view.sponsors.is_none());
    assert!(view.top_sponsors.is_none());
    assert_eq!(view.summary.total_impressions, 2);
    assert_eq!(view.summary.total_clicks, 1);
    assert_eq!(view.summary.unique_events, 1);
    assert_eq!(view.summary.unique_sponsors, 1);
    assert_eq!(view.surfaces.len(), 1);
    assert_eq!(view.surfaces[0].id, "poster");

    let events = view.events.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ctr, 50.0);
}

#[tokio::test]
async fn test_sponsor_view_without_records_keeps_full_envelope() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;

    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());
    let view = service
        .get_sponsor_analytics(&sponsor_request("gala", "S9"))
        .await
        .unwrap();

    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(
        value["summary"],
        serde_json::json!({
            "totalImpressions": 0,
            "totalClicks": 0,
            "totalQrScans": 0,
            "totalSignups": 0,
            "uniqueEvents": 0,
            "uniqueSponsors": 0
        })
    );
    assert_eq!(value["surfaces"], serde_json::json!([]));
    assert!(value["sponsors"].is_null());
    assert!(value["events"].is_null());
    assert!(value["topSponsors"].is_null());
    assert!(value["lastUpdatedISO"].is_string());
}

#[tokio::test]
async fn test_event_filter() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;

    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());
    let mut request = organizer("gala");
    request.event_id = Some("E2".to_string());

    let view = service.get_shared_analytics(&request).await.unwrap();

    assert_eq!(view.summary.total_impressions, 2);
    assert_eq!(view.summary.unique_events, 1);
    let sponsors = view.sponsors.unwrap();
    assert_eq!(sponsors.len(), 1);
    assert_eq!(sponsors[0].id, "S3");
}

#[tokio::test]
async fn test_repeated_requests_differ_only_in_timestamp() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;

    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());
    let mut first = service.get_shared_analytics(&organizer("gala")).await.unwrap();
    let second = service.get_shared_analytics(&organizer("gala")).await.unwrap();

    first.last_updated_iso = second.last_updated_iso.clone();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_contract_violations_are_bad_input() {
    let storage = create_test_storage().await;
    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());

    let err = service
        .get_shared_analytics(&SharedAnalyticsRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadInput);

    let request = SharedAnalyticsRequest {
        brand_id: Some("gala".to_string()),
        is_sponsor_view: Some(true),
        ..Default::default()
    };
    let err = service.get_shared_analytics(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadInput);
}

#[tokio::test]
async fn test_unknown_brand_is_not_found() {
    let storage = create_test_storage().await;
    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());

    let err = service
        .get_shared_analytics(&organizer("nobody"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // A registered brand without any metrics is not an error
    storage.upsert_brand("quiet", "Quiet Brand").await.unwrap();
    let view = service.get_shared_analytics(&organizer("quiet")).await.unwrap();
    assert_eq!(view.sponsors, Some(vec![]));
    assert!(view.events.is_none());
    assert!(view.top_sponsors.is_none());
}

#[tokio::test]
async fn test_memoized_reports_within_ttl() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;

    let config = AnalyticsConfig {
        report_cache_ttl_secs: 60,
        ..AnalyticsConfig::default()
    };
    let service = AnalyticsService::new(Arc::clone(&storage), config);
    let first = service.get_shared_analytics(&organizer("gala")).await.unwrap();

    storage
        .append_events(
            "gala",
            &[metric("E3", Surface::Poster, MetricKind::Impression)],
        )
        .await
        .unwrap();

    let cached = service.get_shared_analytics(&organizer("gala")).await.unwrap();
    assert_eq!(first, cached);

    // Different scope is a different cache entry
    let mut request = organizer("gala");
    request.event_id = Some("E3".to_string());
    let fresh = service.get_shared_analytics(&request).await.unwrap();
    assert_eq!(fresh.summary.total_impressions, 1);
}

#[tokio::test]
async fn test_without_cache_every_request_recomputes() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;

    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());
    let before = service.get_shared_analytics(&organizer("gala")).await.unwrap();

    storage
        .append_events(
            "gala",
            &[metric("E3", Surface::Poster, MetricKind::Impression)],
        )
        .await
        .unwrap();

    let after = service.get_shared_analytics(&organizer("gala")).await.unwrap();
    assert_eq!(
        after.summary.total_impressions,
        before.summary.total_impressions + 1
    );
}

#[tokio::test]
async fn test_top_sponsors_never_exceed_three() {
    let storage = create_test_storage().await;
    let events: Vec<RawMetricEvent> = (1..=5)
        .map(|i| metric("E1", Surface::Display, MetricKind::Click).with_sponsor(&format!("S{i}")))
        .collect();
    storage.append_events("expo", &events).await.unwrap();

    let config = AnalyticsConfig {
        top_sponsors: 5,
        ..AnalyticsConfig::default()
    };
    let service = AnalyticsService::new(Arc::clone(&storage), config);
    let view = service.get_shared_analytics(&organizer("expo")).await.unwrap();

    assert_eq!(view.sponsors.unwrap().len(), 5);
    assert_eq!(view.top_sponsors.unwrap().len(), 3);
}

#[tokio::test]
async fn test_oversized_cache_ttl_is_bounded() {
    let storage = create_test_storage().await;
    seed_gala(&storage).await;

    let config = AnalyticsConfig {
        report_cache_ttl_secs: u64::MAX,
        ..AnalyticsConfig::default()
    };
    let service = AnalyticsService::new(Arc::clone(&storage), config);

    let first = service.get_shared_analytics(&organizer("gala")).await.unwrap();
    let second = service.get_shared_analytics(&organizer("gala")).await.unwrap();
    assert_eq!(first, second);
}

/// Storage whose registries or log can be made to fail
struct FlakyStorage {
    inner: Arc<dyn Storage>,
    fail_fetch: bool,
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn append_events(&self, brand_id: &str, events: &[RawMetricEvent]) -> StorageResult<u64> {
        self.inner.append_events(brand_id, events).await
    }

    async fn fetch_records(&self, brand_id: &str) -> Result<Vec<RawMetricEvent>> {
        if self.fail_fetch {
            return Err(anyhow!("metric log unavailable"));
        }
        self.inner.fetch_records(brand_id).await
    }

    async fn brand_exists(&self, brand_id: &str) -> Result<bool> {
        self.inner.brand_exists(brand_id).await
    }

    async fn upsert_brand(&self, brand_id: &str, name: &str) -> StorageResult<()> {
        self.inner.upsert_brand(brand_id, name).await
    }

    async fn upsert_event(
        &self,
        brand_id: &str,
        event_id: &str,
        name: &str,
        sponsors_json: Option<&str>,
    ) -> StorageResult<()> {
        self.inner
            .upsert_event(brand_id, event_id, name, sponsors_json)
            .await
    }

    async fn upsert_sponsor(&self, brand_id: &str, sponsor_id: &str, name: &str) -> StorageResult<()> {
        self.inner.upsert_sponsor(brand_id, sponsor_id, name).await
    }

    async fn lookup_events(&self, _brand_id: &str) -> Result<Vec<EventRecord>> {
        Err(anyhow!("event registry unavailable"))
    }

    async fn lookup_sponsors(&self, _brand_id: &str) -> Result<Vec<SponsorRecord>> {
        Err(anyhow!("sponsor registry unavailable"))
    }
}

#[tokio::test]
async fn test_name_registry_failures_fall_back_to_ids() {
    let inner = create_test_storage().await;
    seed_gala(&inner).await;
    seed_names(&inner).await;

    let storage: Arc<dyn Storage> = Arc::new(FlakyStorage {
        inner,
        fail_fetch: false,
    });
    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());

    let view = service.get_shared_analytics(&organizer("gala")).await.unwrap();

    for sponsor in view.sponsors.unwrap() {
        assert_eq!(sponsor.name, sponsor.id);
    }
    for event in view.events.unwrap() {
        assert_eq!(event.name, event.id);
    }
}

#[tokio::test]
async fn test_fetch_failure_is_internal_with_correlation_id() {
    let inner = create_test_storage().await;
    seed_gala(&inner).await;

    let storage: Arc<dyn Storage> = Arc::new(FlakyStorage {
        inner,
        fail_fetch: true,
    });
    let service = AnalyticsService::new(Arc::clone(&storage), AnalyticsConfig::default());

    let err = service
        .get_shared_analytics(&organizer("gala"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(err, AnalyticsError::Internal { .. }));
    assert!(err.corr_id().is_some());
    assert!(!err.to_string().contains("metric log unavailable"));
}
