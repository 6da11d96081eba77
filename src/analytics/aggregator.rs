//! Grouping of raw metric events by report dimension
//!
//! Every aggregation is a single linear pass over an already-filtered
//! slice of records. Groups remember the order in which their key was first
//! seen so that ranking ties resolve deterministically.

use std::collections::{HashMap, HashSet};

use crate::models::{MetricKind, RawMetricEvent};

/// Dimension a report groups records by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Surface,
    Sponsor,
    Event,
}

impl Dimension {
    /// Grouping key of a record for this dimension.
    /// Records without the key are left out of the grouping.
    fn key<'a>(&self, record: &'a RawMetricEvent) -> Option<&'a str> {
        match self {
            Dimension::Surface => Some(record.surface.as_str()),
            Dimension::Sponsor => record.sponsor_key(),
            Dimension::Event => record.event_key(),
        }
    }
}

/// Occurrence counters for a single group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCounts {
    pub impressions: u64,
    pub clicks: u64,
    pub qr_scans: u64,
    pub signups: u64,
}

impl RawCounts {
    pub fn record(&mut self, metric: MetricKind) {
        match metric {
            MetricKind::Impression => self.impressions += 1,
            MetricKind::Click => self.clicks += 1,
            MetricKind::QrScan => self.qr_scans += 1,
            MetricKind::Signup => self.signups += 1,
            MetricKind::Unrecognized => {}
        }
    }

    fn merge(&mut self, other: &RawCounts) {
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.qr_scans += other.qr_scans;
        self.signups += other.signups;
    }
}

/// Counters keyed by group, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    index: HashMap<String, usize>,
    entries: Vec<(String, RawCounts)>,
}

impl Aggregation {
    fn entry(&mut self, key: &str) -> &mut RawCounts {
        let position = match self.index.get(key).copied() {
            Some(position) => position,
            None => {
                self.entries.push((key.to_string(), RawCounts::default()));
                let position = self.entries.len() - 1;
                self.index.insert(key.to_string(), position);
                position
            }
        };

        &mut self.entries[position].1
    }

    pub fn get(&self, key: &str) -> Option<&RawCounts> {
        self.index.get(key).map(|position| &self.entries[*position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every group's counters
    pub fn totals(&self) -> RawCounts {
        let mut totals = RawCounts::default();
        for (_, counts) in &self.entries {
            totals.merge(counts);
        }
        totals
    }

    /// Groups sorted by impressions descending; equal impressions keep
    /// first-seen order.
    pub fn into_ranked(self) -> Vec<(String, RawCounts)> {
        let mut entries = self.entries;
        // sort_by is stable
        entries.sort_by(|a, b| b.1.impressions.cmp(&a.1.impressions));
        entries
    }
}

/// Group records by `dimension` and count each metric kind per group
pub fn aggregate_by(dimension: Dimension, records: &[RawMetricEvent]) -> Aggregation {
    let mut aggregation = Aggregation::default();

    for record in records {
        let Some(key) = dimension.key(record) else {
            continue;
        };
        aggregation.entry(key).record(record.metric);
    }

    aggregation
}

/// Counters over every record, regardless of grouping keys
pub fn total_counts(records: &[RawMetricEvent]) -> RawCounts {
    let mut totals = RawCounts::default();
    for record in records {
        totals.record(record.metric);
    }
    totals
}

/// Distinct event and sponsor ids among the first `cap` records.
///
/// Only a bounded prefix is inspected so memory stays flat on very large
/// logs; counts over longer inputs are a lower bound.
pub fn count_distinct_ids(records: &[RawMetricEvent], cap: usize) -> (u64, u64) {
    let mut events = HashSet::new();
    let mut sponsors = HashSet::new();

    for record in records.iter().take(cap) {
        if let Some(event_id) = record.event_key() {
            events.insert(event_id);
        }
        if let Some(sponsor_id) = record.sponsor_key() {
            sponsors.insert(sponsor_id);
        }
    }

    (events.len() as u64, sponsors.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Surface;

    fn event(event_id: &str, surface: Surface, metric: MetricKind) -> RawMetricEvent {
        RawMetricEvent::new(Some(event_id), surface, metric)
    }

    #[test]
    fn test_aggregate_by_event_counts_each_metric() {
        let records = vec![
            event("E1", Surface::Poster, MetricKind::Impression),
            event("E1", Surface::Poster, MetricKind::Impression),
            event("E1", Surface::Poster, MetricKind::Click),
            event("E1", Surface::Signup, MetricKind::Signup),
            event("E2", Surface::Display, MetricKind::QrScan),
        ];

        let aggregation = aggregate_by(Dimension::Event, &records);

        assert_eq!(aggregation.len(), 2);
        let e1 = aggregation.get("E1").unwrap();
        assert_eq!(e1.impressions, 2);
        assert_eq!(e1.clicks, 1);
        assert_eq!(e1.signups, 1);
        assert_eq!(aggregation.get("E2").unwrap().qr_scans, 1);
    }

    #[test]
    fn test_records_without_sponsor_are_skipped() {
        let records = vec![
            event("E1", Surface::Poster, MetricKind::Impression).with_sponsor("S1"),
            event("E1", Surface::Poster, MetricKind::Impression),
            event("E1", Surface::Poster, MetricKind::Click).with_sponsor(""),
        ];

        let aggregation = aggregate_by(Dimension::Sponsor, &records);

        assert_eq!(aggregation.len(), 1);
        assert_eq!(aggregation.get("S1").unwrap().impressions, 1);
    }

    #[test]
    fn test_unrecognized_surfaces_share_unknown_bucket() {
        let records: Vec<RawMetricEvent> = ["KIOSK", "tv", "Poster"]
            .iter()
            .map(|raw| event("E1", Surface::parse(raw), MetricKind::Impression))
            .collect();

        let aggregation = aggregate_by(Dimension::Surface, &records);

        assert_eq!(aggregation.get("unknown").unwrap().impressions, 2);
        assert_eq!(aggregation.get("poster").unwrap().impressions, 1);
    }

    #[test]
    fn test_unrecognized_metric_increments_nothing() {
        let records = vec![event("E1", Surface::Poster, MetricKind::Unrecognized)];

        let aggregation = aggregate_by(Dimension::Event, &records);

        assert_eq!(aggregation.get("E1"), Some(&RawCounts::default()));
        assert_eq!(total_counts(&records), RawCounts::default());
    }

    #[test]
    fn test_ranking_ties_keep_first_seen_order() {
        let records = vec![
            event("B", Surface::Poster, MetricKind::Impression),
            event("A", Surface::Poster, MetricKind::Impression),
            event("C", Surface::Poster, MetricKind::Impression),
            event("C", Surface::Poster, MetricKind::Impression),
        ];

        let ranked = aggregate_by(Dimension::Event, &records).into_ranked();
        let keys: Vec<&str> = ranked.iter().map(|(key, _)| key.as_str()).collect();

        assert_eq!(keys, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_totals_match_surface_grouping() {
        let records = vec![
            event("E1", Surface::Poster, MetricKind::Impression),
            event("E2", Surface::Admin, MetricKind::Impression),
            event("E2", Surface::Unknown, MetricKind::Click),
        ];

        let surfaces = aggregate_by(Dimension::Surface, &records);

        assert_eq!(surfaces.totals(), total_counts(&records));
    }

    #[test]
    fn test_count_distinct_ids_respects_cap() {
        let records: Vec<RawMetricEvent> = (0..20)
            .map(|i| {
                event(&format!("E{i}"), Surface::Poster, MetricKind::Impression)
                    .with_sponsor(&format!("S{}", i % 4))
            })
            .collect();

        assert_eq!(count_distinct_ids(&records, 100), (20, 4));
        assert_eq!(count_distinct_ids(&records, 5), (5, 4));
        assert_eq!(count_distinct_ids(&records, 0), (0, 0));
    }
}
