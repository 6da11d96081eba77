//! Request-level entry points for shared and sponsor analytics
//!
//! Each request validates its input, fetches the brand's raw log, resolves
//! names and builds a fresh view. Nothing is written back. An optional moka
//! cache memoizes finished views for a short TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;
use tracing::debug;

use crate::analytics::error::AnalyticsError;
use crate::analytics::names::NameResolver;
use crate::analytics::view::{ViewBuilder, ViewScope};
use crate::config::{AnalyticsConfig, MAX_REPORT_CACHE_TTL_SECS};
use crate::models::SharedAnalyticsView;
use crate::storage::Storage;

/// Parameters of a shared analytics request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAnalyticsRequest {
    pub brand_id: Option<String>,
    pub event_id: Option<String>,
    pub sponsor_id: Option<String>,
    pub is_sponsor_view: Option<bool>,
}

/// Parameters of a sponsor analytics request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorAnalyticsRequest {
    pub brand_id: Option<String>,
    pub sponsor_id: Option<String>,
    pub event_id: Option<String>,
}

impl From<SponsorAnalyticsRequest> for SharedAnalyticsRequest {
    fn from(req: SponsorAnalyticsRequest) -> Self {
        Self {
            brand_id: req.brand_id,
            event_id: req.event_id,
            sponsor_id: req.sponsor_id,
            is_sponsor_view: Some(true),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SharedAnalyticsRequest {
    /// Check the caller contract and derive the view scope
    pub fn validate(&self) -> Result<(&str, ViewScope), AnalyticsError> {
        let brand_id = present(&self.brand_id)
            .ok_or_else(|| AnalyticsError::BadInput("brandId is required".to_string()))?;

        let sponsor_id = present(&self.sponsor_id);

        let mut scope = if self.is_sponsor_view.unwrap_or(false) {
            let sponsor_id = sponsor_id.ok_or_else(|| {
                AnalyticsError::BadInput("sponsorId is required for the sponsor view".to_string())
            })?;
            ViewScope::sponsor(sponsor_id)
        } else {
            let scope = ViewScope::organizer();
            match sponsor_id {
                Some(sponsor_id) => scope.for_sponsor(sponsor_id),
                None => scope,
            }
        };

        if let Some(event_id) = present(&self.event_id) {
            scope = scope.for_event(event_id);
        }

        Ok((brand_id, scope))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ReportKey {
    brand_id: String,
    scope: ViewScope,
}

pub struct AnalyticsService {
    storage: Arc<dyn Storage>,
    resolver: NameResolver,
    config: AnalyticsConfig,
    reports: Option<Cache<ReportKey, SharedAnalyticsView>>,
}

impl AnalyticsService {
    pub fn new(storage: Arc<dyn Storage>, config: AnalyticsConfig) -> Self {
        let resolver = NameResolver::new(Arc::clone(&storage));
        Self::with_resolver(storage, resolver, config)
    }

    pub fn with_resolver(
        storage: Arc<dyn Storage>,
        resolver: NameResolver,
        config: AnalyticsConfig,
    ) -> Self {
        let reports = (config.report_cache_ttl_secs > 0).then(|| {
            Cache::builder()
                .max_capacity(config.report_cache_max_entries)
                .time_to_live(Duration::from_secs(
                    config.report_cache_ttl_secs.min(MAX_REPORT_CACHE_TTL_SECS),
                ))
                .build()
        });

        Self {
            storage,
            resolver,
            config,
            reports,
        }
    }

    /// Organizer or sponsor view, depending on `is_sponsor_view`
    pub async fn get_shared_analytics(
        &self,
        request: &SharedAnalyticsRequest,
    ) -> Result<SharedAnalyticsView, AnalyticsError> {
        let (brand_id, scope) = request.validate()?;
        self.report(brand_id, scope).await
    }

    /// Sponsor-scoped view for `sponsor_id`
    pub async fn get_sponsor_analytics(
        &self,
        request: &SponsorAnalyticsRequest,
    ) -> Result<SharedAnalyticsView, AnalyticsError> {
        let request = SharedAnalyticsRequest::from(request.clone());
        self.get_shared_analytics(&request).await
    }

    async fn report(
        &self,
        brand_id: &str,
        scope: ViewScope,
    ) -> Result<SharedAnalyticsView, AnalyticsError> {
        let key = ReportKey {
            brand_id: brand_id.to_string(),
            scope,
        };

        if let Some(reports) = &self.reports {
            if let Some(view) = reports.get(&key).await {
                debug!(brand_id, "serving memoized analytics view");
                return Ok(view);
            }
        }

        let known = self
            .storage
            .brand_exists(brand_id)
            .await
            .map_err(AnalyticsError::internal)?;
        if !known {
            return Err(AnalyticsError::NotFound(format!(
                "Brand '{brand_id}' not found"
            )));
        }

        let records = self
            .storage
            .fetch_records(brand_id)
            .await
            .map_err(AnalyticsError::internal)?;
        let names = self.resolver.resolve(brand_id).await;

        debug!(
            brand_id,
            records = records.len(),
            sponsor_scoped = key.scope.is_sponsor_scoped(),
            "building analytics view"
        );

        let view = ViewBuilder::new(&names)
            .with_unique_id_cap(self.config.unique_id_cap)
            .with_top_sponsors(self.config.top_sponsors)
            .build(records, &key.scope);

        if let Some(reports) = &self.reports {
            reports.insert(key, view.clone()).await;
        }

        Ok(view)
    }
}
