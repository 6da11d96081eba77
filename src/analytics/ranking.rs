use crate::models::SponsorMetrics;

/// Top `n` sponsors by the metric `by` extracts, descending. Ties keep their
/// input order. Never returns more than `n` entries; an empty input yields
/// an empty vec.
pub fn top_n<F>(entities: &[SponsorMetrics], n: usize, by: F) -> Vec<SponsorMetrics>
where
    F: Fn(&SponsorMetrics) -> u64,
{
    let mut ranked = entities.to_vec();
    ranked.sort_by_key(|metrics| std::cmp::Reverse(by(metrics)));
    ranked.truncate(n);
    ranked
}

/// Ranking key for the `topSponsors` highlight list
pub fn by_clicks(metrics: &SponsorMetrics) -> u64 {
    metrics.clicks
}
