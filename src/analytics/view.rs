//! Assembly of the shared analytics view
//!
//! The builder filters the raw log for the requested scope, aggregates it
//! along every dimension, attaches display names and derived ratios, and
//! fills the frozen [`SharedAnalyticsView`] envelope. It is a pure function
//! of its input apart from the `lastUpdatedISO` stamp.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::analytics::aggregator::{aggregate_by, count_distinct_ids, total_counts, Dimension};
use crate::analytics::derived::{ctr, engagement_rate};
use crate::analytics::names::ResolvedNames;
use crate::analytics::ranking::{by_clicks, top_n};
use crate::models::{
    AnalyticsSummary, EventMetrics, RawMetricEvent, SharedAnalyticsView, SponsorMetrics, Surface,
    SurfaceMetrics,
};

pub const DEFAULT_UNIQUE_ID_CAP: usize = 10_000;
/// Upper bound on the length of `topSponsors`
pub const MAX_TOP_SPONSORS: usize = 3;
pub const DEFAULT_TOP_SPONSORS: usize = MAX_TOP_SPONSORS;

/// Who the view is for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewMode {
    /// Full visibility over every sponsor and event of the brand
    Organizer,
    /// Only the given sponsor's own records
    SponsorScoped { sponsor_id: String },
}

/// Record filters applied before any aggregation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewScope {
    pub mode: ViewMode,
    pub event_id: Option<String>,
    /// Sponsor filter for an organizer view. Sponsor-scoped views carry
    /// their sponsor in the mode instead.
    pub sponsor_id: Option<String>,
}

impl ViewScope {
    pub fn organizer() -> Self {
        Self {
            mode: ViewMode::Organizer,
            event_id: None,
            sponsor_id: None,
        }
    }

    pub fn sponsor(sponsor_id: &str) -> Self {
        Self {
            mode: ViewMode::SponsorScoped {
                sponsor_id: sponsor_id.to_string(),
            },
            event_id: None,
            sponsor_id: None,
        }
    }

    pub fn for_event(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn for_sponsor(mut self, sponsor_id: &str) -> Self {
        self.sponsor_id = Some(sponsor_id.to_string());
        self
    }

    pub fn is_sponsor_scoped(&self) -> bool {
        matches!(self.mode, ViewMode::SponsorScoped { .. })
    }

    fn admits(&self, record: &RawMetricEvent) -> bool {
        let Some(event_id) = record.event_key() else {
            return false;
        };

        if let Some(wanted) = self.event_id.as_deref() {
            if event_id != wanted {
                return false;
            }
        }

        let wanted_sponsor = match &self.mode {
            ViewMode::Organizer => self.sponsor_id.as_deref(),
            ViewMode::SponsorScoped { sponsor_id } => Some(sponsor_id.as_str()),
        };

        match wanted_sponsor {
            Some(wanted) => record.sponsor_key() == Some(wanted),
            None => true,
        }
    }
}

pub struct ViewBuilder<'a> {
    names: &'a ResolvedNames,
    unique_id_cap: usize,
    top_sponsors: usize,
}

impl<'a> ViewBuilder<'a> {
    pub fn new(names: &'a ResolvedNames) -> Self {
        Self {
            names,
            unique_id_cap: DEFAULT_UNIQUE_ID_CAP,
            top_sponsors: DEFAULT_TOP_SPONSORS,
        }
    }

    pub fn with_unique_id_cap(mut self, cap: usize) -> Self {
        self.unique_id_cap = cap;
        self
    }

    /// Length of the `topSponsors` list, capped at [`MAX_TOP_SPONSORS`]
    pub fn with_top_sponsors(mut self, n: usize) -> Self {
        self.top_sponsors = n.min(MAX_TOP_SPONSORS);
        self
    }

    pub fn build(&self, records: Vec<RawMetricEvent>, scope: &ViewScope) -> SharedAnalyticsView {
        self.build_at(records, scope, Utc::now())
    }

    pub fn build_at(
        &self,
        mut records: Vec<RawMetricEvent>,
        scope: &ViewScope,
        now: DateTime<Utc>,
    ) -> SharedAnalyticsView {
        records.retain(|record| scope.admits(record));

        let surfaces = self.surfaces(&records);
        let events = self.events(&records);

        let sponsors = if scope.is_sponsor_scoped() {
            None
        } else {
            Some(self.sponsors(&records))
        };

        let top_sponsors = sponsors
            .as_deref()
            .filter(|sponsors| !sponsors.is_empty())
            .map(|sponsors| top_n(sponsors, self.top_sponsors, by_clicks));

        SharedAnalyticsView {
            last_updated_iso: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            summary: self.summary(&records),
            surfaces,
            sponsors,
            events: (!events.is_empty()).then_some(events),
            top_sponsors,
        }
    }

    fn summary(&self, records: &[RawMetricEvent]) -> AnalyticsSummary {
        let totals = total_counts(records);
        let (unique_events, unique_sponsors) = count_distinct_ids(records, self.unique_id_cap);

        AnalyticsSummary {
            total_impressions: totals.impressions,
            total_clicks: totals.clicks,
            total_qr_scans: totals.qr_scans,
            total_signups: totals.signups,
            unique_events,
            unique_sponsors,
        }
    }

    fn surfaces(&self, records: &[RawMetricEvent]) -> Vec<SurfaceMetrics> {
        aggregate_by(Dimension::Surface, records)
            .into_ranked()
            .into_iter()
            .map(|(id, counts)| SurfaceMetrics {
                label: Surface::parse(&id).label().to_string(),
                id,
                impressions: counts.impressions,
                clicks: counts.clicks,
                qr_scans: counts.qr_scans,
                engagement_rate: engagement_rate(counts.clicks, counts.qr_scans, counts.impressions),
            })
            .collect()
    }

    fn sponsors(&self, records: &[RawMetricEvent]) -> Vec<SponsorMetrics> {
        aggregate_by(Dimension::Sponsor, records)
            .into_ranked()
            .into_iter()
            .map(|(id, counts)| SponsorMetrics {
                name: self.names.sponsor_name(&id).to_string(),
                id,
                impressions: counts.impressions,
                clicks: counts.clicks,
                ctr: ctr(counts.clicks, counts.impressions),
            })
            .collect()
    }

    fn events(&self, records: &[RawMetricEvent]) -> Vec<EventMetrics> {
        aggregate_by(Dimension::Event, records)
            .into_ranked()
            .into_iter()
            .map(|(id, counts)| EventMetrics {
                name: self.names.event_name(&id).to_string(),
                id,
                impressions: counts.impressions,
                clicks: counts.clicks,
                ctr: ctr(counts.clicks, counts.impressions),
                signups_count: counts.signups,
            })
            .collect()
    }
}
