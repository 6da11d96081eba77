//! The frozen wire shape of the shared analytics report.
//!
//! Field names, types and nullability here are a published contract:
//! adding a field requires a version bump, and existing fields must not
//! change.

use serde::{Deserialize, Serialize};

/// Per-surface metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceMetrics {
    pub id: String,
    pub label: String,
    pub impressions: u64,
    pub clicks: u64,
    pub qr_scans: u64,
    /// (clicks + qrScans) / impressions, percent with one decimal
    pub engagement_rate: f64,
}

/// Per-sponsor metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorMetrics {
    pub id: String,
    pub name: String,
    pub impressions: u64,
    pub clicks: u64,
    /// clicks / impressions, percent with two decimals
    pub ctr: f64,
}

/// Per-event metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetrics {
    pub id: String,
    pub name: String,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub signups_count: u64,
}

/// Global totals for the filtered record set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_qr_scans: u64,
    pub total_signups: u64,
    pub unique_events: u64,
    pub unique_sponsors: u64,
}

/// Analytics report shared by the organizer and sponsor views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAnalyticsView {
    #[serde(rename = "lastUpdatedISO")]
    pub last_updated_iso: String,
    pub summary: AnalyticsSummary,
    pub surfaces: Vec<SurfaceMetrics>,
    /// `None` exactly when the view is sponsor-scoped
    pub sponsors: Option<Vec<SponsorMetrics>>,
    pub events: Option<Vec<EventMetrics>>,
    pub top_sponsors: Option<Vec<SponsorMetrics>>,
}
