//! Ratio metric derivation under the safe-division policy. The same rules
//! apply to single rows, campaign aggregates and overall totals.

use campaign_core::types::{CleanRecord, DerivedRecord, Metric, RatioMetrics};

/// Divide, returning `None` when the denominator is zero or the result would
/// not be finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

/// Derive CTR, CPC, CPA and ROAS from volume figures.
pub fn derive_ratios(
    impressions: u64,
    clicks: u64,
    spend: f64,
    revenue: f64,
    conversions: u64,
) -> RatioMetrics {
    let mut metrics = RatioMetrics::default();
    let inputs = [
        (Metric::Ctr, clicks as f64, impressions as f64),
        (Metric::Cpc, spend, clicks as f64),
        (Metric::Cpa, spend, conversions as f64),
        (Metric::Roas, revenue, spend),
    ];

    for (metric, numerator, denominator) in inputs {
        match safe_ratio(numerator, denominator) {
            Some(value) => match metric {
                Metric::Ctr => metrics.ctr = value,
                Metric::Cpc => metrics.cpc = value,
                Metric::Cpa => metrics.cpa = value,
                Metric::Roas => metrics.roas = value,
            },
            None => metrics.mark_undefined(metric),
        }
    }

    metrics
}

pub fn derive_record(record: CleanRecord) -> DerivedRecord {
    let metrics = derive_ratios(
        record.impressions,
        record.clicks,
        record.spend,
        record.revenue,
        record.conversions,
    );
    DerivedRecord { record, metrics }
}

pub fn derive_all(records: Vec<CleanRecord>) -> Vec<DerivedRecord> {
    records.into_iter().map(derive_record).collect()
}
