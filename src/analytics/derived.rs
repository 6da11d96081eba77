//! Ratio metrics derived from aggregated counts.
//!
//! Both ratios are percentages in `[0, 100]` and are `0` whenever there
//! are no impressions, so they never produce `NaN` or infinities.

/// Round half away from zero to a fixed number of decimal places
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn percentage(numerator: u64, impressions: u64, decimals: i32) -> f64 {
    if impressions == 0 {
        return 0.0;
    }

    let pct = numerator as f64 / impressions as f64 * 100.0;
    round_to(pct, decimals).clamp(0.0, 100.0)
}

/// Click-through rate, two decimals
pub fn ctr(clicks: u64, impressions: u64) -> f64 {
    percentage(clicks, impressions, 2)
}

/// Engagement rate over clicks and QR scans, one decimal
pub fn engagement_rate(clicks: u64, qr_scans: u64, impressions: u64) -> f64 {
    percentage(clicks.saturating_add(qr_scans), impressions, 1)
}
