//! Raw interaction events as they appear in the append-only metric log

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Display channel where an interaction happened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Surface {
    Poster,
    Display,
    Public,
    Signup,
    Admin,
    #[default]
    Unknown,
}

/// Human-readable labels for each surface
const SURFACE_LABELS: [(Surface, &str); 6] = [
    (Surface::Poster, "Poster"),
    (Surface::Display, "Display"),
    (Surface::Public, "Public Page"),
    (Surface::Signup, "Signup Form"),
    (Surface::Admin, "Admin"),
    (Surface::Unknown, "Unknown"),
];

impl Surface {
    /// Parse a surface name, case-insensitively. Anything unrecognized is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "poster" => Surface::Poster,
            "display" => Surface::Display,
            "public" => Surface::Public,
            "signup" => Surface::Signup,
            "admin" => Surface::Admin,
            _ => Surface::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Poster => "poster",
            Surface::Display => "display",
            Surface::Public => "public",
            Surface::Signup => "signup",
            Surface::Admin => "admin",
            Surface::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        SURFACE_LABELS
            .iter()
            .find(|(surface, _)| surface == self)
            .map(|(_, label)| *label)
            .unwrap_or("Unknown")
    }
}

impl From<String> for Surface {
    fn from(raw: String) -> Self {
        Surface::parse(&raw)
    }
}

/// Kind of interaction recorded by a metric event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum MetricKind {
    Impression,
    Click,
    QrScan,
    Signup,
    /// Metric name the log carries but the reports do not understand.
    /// Such events increment no counter.
    #[default]
    Unrecognized,
}

impl MetricKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "impression" => MetricKind::Impression,
            "click" => MetricKind::Click,
            "qr_scan" => MetricKind::QrScan,
            "signup" => MetricKind::Signup,
            _ => MetricKind::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Impression => "impression",
            MetricKind::Click => "click",
            MetricKind::QrScan => "qr_scan",
            MetricKind::Signup => "signup",
            MetricKind::Unrecognized => "unrecognized",
        }
    }
}

impl From<String> for MetricKind {
    fn from(raw: String) -> Self {
        MetricKind::parse(&raw)
    }
}

/// A single logged interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetricEvent {
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default)]
    pub event_id: Option<String>,

    #[serde(default)]
    pub surface: Surface,

    #[serde(default)]
    pub metric: MetricKind,

    #[serde(default)]
    pub sponsor_id: Option<String>,

    #[serde(default)]
    pub value: Option<f64>,
}

impl RawMetricEvent {
    pub fn new(event_id: Option<&str>, surface: Surface, metric: MetricKind) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            event_id: event_id.map(str::to_string),
            surface,
            metric,
            sponsor_id: None,
            value: None,
        }
    }

    pub fn with_sponsor(mut self, sponsor_id: &str) -> Self {
        self.sponsor_id = Some(sponsor_id.to_string());
        self
    }

    /// Event id, if present and non-blank
    pub fn event_key(&self) -> Option<&str> {
        non_blank(self.event_id.as_deref())
    }

    /// Sponsor id, if present and non-blank
    pub fn sponsor_key(&self) -> Option<&str> {
        non_blank(self.sponsor_id.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Row shape of the `metric_events` table
#[derive(Debug, Clone, FromRow)]
pub struct MetricEventRow {
    pub timestamp: i64,
    pub event_id: Option<String>,
    pub surface: String,
    pub metric: String,
    pub sponsor_id: Option<String>,
    pub value: Option<f64>,
}

impl From<MetricEventRow> for RawMetricEvent {
    fn from(row: MetricEventRow) -> Self {
        Self {
            timestamp: row.timestamp,
            event_id: row.event_id,
            surface: Surface::parse(&row.surface),
            metric: MetricKind::parse(&row.metric),
            sponsor_id: row.sponsor_id,
            value: row.value,
        }
    }
}
