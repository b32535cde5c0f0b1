//! Campaign aggregation: groups derived rows by campaign id, sums volumes
//! and re-derives ratios from the sums.

use campaign_core::types::{CampaignSummary, DerivedRecord, Metric, RatioMetrics, SummaryOrder};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::deriver::derive_ratios;

/// Volume totals with order-independent floating point sums.
#[derive(Debug, Clone, Default)]
pub struct VolumeTotals {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    spend: Vec<f64>,
    revenue: Vec<f64>,
}

impl VolumeTotals {
    pub fn add(&mut self, impressions: u64, clicks: u64, spend: f64, revenue: f64, conversions: u64) {
        self.impressions = self.impressions.saturating_add(impressions);
        self.clicks = self.clicks.saturating_add(clicks);
        self.conversions = self.conversions.saturating_add(conversions);
        self.spend.push(spend);
        self.revenue.push(revenue);
    }

    /// Sum the money columns and derive ratios from the totals.
    pub fn settle(&self) -> SettledTotals {
        let spend = canonical_sum(&self.spend);
        let revenue = canonical_sum(&self.revenue);
        let total_spend = spend.unwrap_or(f64::MAX);
        let total_revenue = revenue.unwrap_or(f64::MAX);

        let mut metrics = derive_ratios(
            self.impressions,
            self.clicks,
            total_spend,
            total_revenue,
            self.conversions,
        );
        if spend.is_none() {
            for metric in [Metric::Cpc, Metric::Cpa, Metric::Roas] {
                metrics.mark_undefined(metric);
            }
        }
        if revenue.is_none() {
            metrics.mark_undefined(Metric::Roas);
        }

        SettledTotals {
            spend: total_spend,
            revenue: total_revenue,
            metrics,
            saturated: spend.is_none() || revenue.is_none(),
        }
    }
}

/// Money totals and the ratios derived from them. A saturated sum is
/// reported as `f64::MAX` and every ratio reading it is undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledTotals {
    pub spend: f64,
    pub revenue: f64,
    pub metrics: RatioMetrics,
    pub saturated: bool,
}

/// Sum in ascending order so the result does not depend on input order.
/// `None` once the sum reaches `f64::MAX`, which also catches an already
/// saturated total being summed again.
pub fn canonical_sum(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let sum: f64 = sorted.iter().sum();
    (sum < f64::MAX).then_some(sum)
}

struct Group {
    campaign_id: String,
    totals: VolumeTotals,
    rows: usize,
}

/// One summary per distinct campaign id, in order of first appearance.
pub fn aggregate(records: &[DerivedRecord]) -> Vec<CampaignSummary> {
    aggregate_checked(records).0
}

/// Like [`aggregate`], also counting campaigns whose money totals overflowed.
pub fn aggregate_checked(records: &[DerivedRecord]) -> (Vec<CampaignSummary>, usize) {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for derived in records {
        let r = &derived.record;
        let slot = *index.entry(r.campaign_id.as_str()).or_insert_with(|| {
            groups.push(Group {
                campaign_id: r.campaign_id.clone(),
                totals: VolumeTotals::default(),
                rows: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group
            .totals
            .add(r.impressions, r.clicks, r.spend, r.revenue, r.conversions);
        group.rows += 1;
    }

    let mut saturated = 0;
    let summaries = groups
        .into_iter()
        .map(|group| {
            let settled = group.totals.settle();
            if settled.saturated {
                saturated += 1;
            }
            summarize(group, settled)
        })
        .collect();
    (summaries, saturated)
}

fn summarize(group: Group, settled: SettledTotals) -> CampaignSummary {
    let totals = &group.totals;
    CampaignSummary {
        metrics: settled.metrics,
        total_impressions: totals.impressions,
        total_clicks: totals.clicks,
        total_spend: settled.spend,
        total_revenue: settled.revenue,
        total_conversions: totals.conversions,
        row_count: group.rows,
        campaign_id: group.campaign_id,
    }
}

/// Reorder summaries in place. Money orders are descending; ties and the id
/// order itself are ascending by campaign id.
pub fn sort_summaries(summaries: &mut [CampaignSummary], order: SummaryOrder) {
    let by_id = |a: &CampaignSummary, b: &CampaignSummary| a.campaign_id.cmp(&b.campaign_id);
    match order {
        SummaryOrder::FirstSeen => {}
        SummaryOrder::CampaignId => summaries.sort_by(by_id),
        SummaryOrder::TotalSpend => summaries.sort_by(|a, b| {
            descending(a.total_spend, b.total_spend).then_with(|| by_id(a, b))
        }),
        SummaryOrder::TotalRevenue => summaries.sort_by(|a, b| {
            descending(a.total_revenue, b.total_revenue).then_with(|| by_id(a, b))
        }),
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
