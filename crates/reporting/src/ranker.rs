//! Best/worst campaign selection.
//!
//! Campaigns are ordered by the configured metric in the configured
//! direction. Exact ties go to the larger `total_spend`, then to the
//! lexically smaller campaign id, so the result never depends on input
//! order. A campaign whose ranking metric is undefined cannot be best; it
//! can only be worst when no campaign has a defined value, in which case
//! the one with the largest spend is chosen.

use campaign_core::config::RankingConfig;
use campaign_core::types::{CampaignRef, CampaignSummary, Direction, RankingMetric};
use std::cmp::Ordering;

/// A summary together with its position in the ranked collection.
#[derive(Debug, Clone, Copy)]
pub struct Ranked<'a> {
    pub index: usize,
    pub summary: &'a CampaignSummary,
}

impl Ranked<'_> {
    pub fn to_ref(&self) -> CampaignRef {
        CampaignRef {
            index: self.index,
            campaign_id: self.summary.campaign_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ranking<'a> {
    pub metric: RankingMetric,
    pub direction: Direction,
    pub best: Option<Ranked<'a>>,
    pub worst: Option<Ranked<'a>>,
    /// Campaigns with a defined value, best first.
    pub ordered: Vec<Ranked<'a>>,
    /// Campaigns whose ranking metric is undefined, in collection order.
    pub excluded: Vec<Ranked<'a>>,
}

impl<'a> Ranking<'a> {
    pub fn top(&self, n: usize) -> &[Ranked<'a>] {
        &self.ordered[..n.min(self.ordered.len())]
    }
}

pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn rank<'a>(&self, campaigns: &'a [CampaignSummary]) -> Ranking<'a> {
        let metric = self.config.metric;
        let mut ordered: Vec<(f64, Ranked<'a>)> = Vec::new();
        let mut excluded: Vec<Ranked<'a>> = Vec::new();

        for (index, summary) in campaigns.iter().enumerate() {
            let ranked = Ranked { index, summary };
            match summary.ranking_value(metric) {
                Some(value) => ordered.push((value, ranked)),
                None => excluded.push(ranked),
            }
        }

        ordered.sort_by(|(va, a), (vb, b)| self.better_first(*va, *vb, a.summary, b.summary));

        let best = ordered.first().map(|(_, r)| *r);
        let worst = match ordered
            .iter()
            .min_by(|(va, a), (vb, b)| self.worse_first(*va, *vb, a.summary, b.summary))
        {
            Some((_, r)) => Some(*r),
            None => excluded
                .iter()
                .min_by(|a, b| tie_break(a.summary, b.summary))
                .copied(),
        };

        Ranking {
            metric,
            direction: self.config.direction,
            best,
            worst,
            ordered: ordered.into_iter().map(|(_, r)| r).collect(),
            excluded,
        }
    }

    fn better_first(&self, va: f64, vb: f64, a: &CampaignSummary, b: &CampaignSummary) -> Ordering {
        let primary = match self.config.direction {
            Direction::HigherIsBetter => vb.total_cmp(&va),
            Direction::LowerIsBetter => va.total_cmp(&vb),
        };
        primary.then_with(|| tie_break(a, b))
    }

    fn worse_first(&self, va: f64, vb: f64, a: &CampaignSummary, b: &CampaignSummary) -> Ordering {
        let primary = match self.config.direction {
            Direction::HigherIsBetter => va.total_cmp(&vb),
            Direction::LowerIsBetter => vb.total_cmp(&va),
        };
        primary.then_with(|| tie_break(a, b))
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

/// Larger spend first, then ascending campaign id.
fn tie_break(a: &CampaignSummary, b: &CampaignSummary) -> Ordering {
    b.total_spend
        .total_cmp(&a.total_spend)
        .then_with(|| a.campaign_id.cmp(&b.campaign_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::{Metric, RatioMetrics};

    fn summary(id: &str, spend: f64, revenue: f64) -> CampaignSummary {
        let mut metrics = RatioMetrics::default();
        if spend == 0.0 {
            metrics.undefined_metrics.insert(Metric::Roas);
        } else {
            metrics.roas = revenue / spend;
        }
        CampaignSummary {
            campaign_id: id.into(),
            total_impressions: 100,
            total_clicks: 10,
            total_spend: spend,
            total_revenue: revenue,
            total_conversions: 1,
            row_count: 1,
            metrics,
        }
    }

    fn ids(ranked: &[Ranked<'_>]) -> Vec<String> {
        ranked.iter().map(|r| r.summary.campaign_id.clone()).collect()
    }

    #[test]
    fn test_default_ranks_by_roas_descending() {
        let campaigns = vec![summary("B", 50.0, 50.0), summary("A", 100.0, 400.0)];
        let ranking = Ranker::default().rank(&campaigns);
        assert_eq!(ranking.best.unwrap().summary.campaign_id, "A");
        assert_eq!(ranking.best.unwrap().index, 1);
        assert_eq!(ranking.worst.unwrap().summary.campaign_id, "B");
    }

    #[test]
    fn test_ties_break_by_spend_then_id() {
        let campaigns = vec![
            summary("C", 10.0, 20.0),
            summary("B", 50.0, 100.0),
            summary("A", 10.0, 20.0),
        ];
        let ranking = Ranker::default().rank(&campaigns);
        assert_eq!(ids(&ranking.ordered), vec!["B", "A", "C"]);
        assert_eq!(ranking.best.unwrap().summary.campaign_id, "B");
        // the worst pick applies the same tie-break among equal values
        assert_eq!(ranking.worst.unwrap().summary.campaign_id, "B");
    }

    #[test]
    fn test_lower_is_better() {
        let config = RankingConfig {
            metric: RankingMetric::Cpc,
            direction: Direction::LowerIsBetter,
            top_n: 5,
        };
        let mut cheap = summary("cheap", 10.0, 0.0);
        cheap.metrics.cpc = 1.0;
        let mut pricey = summary("pricey", 90.0, 0.0);
        pricey.metrics.cpc = 9.0;
        let campaigns = vec![pricey, cheap];

        let ranking = Ranker::new(config).rank(&campaigns);
        assert_eq!(ranking.best.unwrap().summary.campaign_id, "cheap");
        assert_eq!(ranking.worst.unwrap().summary.campaign_id, "pricey");
    }

    #[test]
    fn test_undefined_excluded_from_best() {
        let campaigns = vec![summary("Z", 0.0, 0.0), summary("A", 10.0, 5.0)];
        let ranking = Ranker::default().rank(&campaigns);
        assert_eq!(ranking.best.unwrap().summary.campaign_id, "A");
        assert_eq!(ranking.worst.unwrap().summary.campaign_id, "A");
        assert_eq!(ids(&ranking.excluded), vec!["Z"]);
    }

    #[test]
    fn test_all_undefined_falls_back_to_spend() {
        let campaigns = vec![
            summary("b", 0.0, 0.0),
            summary("c", 0.0, 0.0),
            summary("a", 0.0, 0.0),
        ];
        let ranking = Ranker::default().rank(&campaigns);
        assert!(ranking.best.is_none());
        // all spends are zero, so the id decides
        assert_eq!(ranking.worst.unwrap().summary.campaign_id, "a");
    }

    #[test]
    fn test_all_undefined_prefers_largest_spend_for_worst() {
        let config = RankingConfig {
            metric: RankingMetric::Cpa,
            ..RankingConfig::default()
        };
        let mut a = summary("a", 5.0, 1.0);
        a.metrics.undefined_metrics.insert(Metric::Cpa);
        let mut b = summary("b", 50.0, 1.0);
        b.metrics.undefined_metrics.insert(Metric::Cpa);
        let campaigns = vec![a, b];

        let ranking = Ranker::new(config).rank(&campaigns);
        assert!(ranking.best.is_none());
        assert_eq!(ranking.worst.unwrap().summary.campaign_id, "b");
    }

    #[test]
    fn test_volume_metric_and_top_n() {
        let config = RankingConfig {
            metric: RankingMetric::TotalRevenue,
            ..RankingConfig::default()
        };
        let campaigns = vec![
            summary("a", 1.0, 10.0),
            summary("b", 0.0, 30.0),
            summary("c", 1.0, 20.0),
        ];
        let ranking = Ranker::new(config).rank(&campaigns);
        // zero spend leaves roas undefined but revenue is always defined
        assert!(ranking.excluded.is_empty());
        assert_eq!(ids(ranking.top(2)), vec!["b", "c"]);
        assert_eq!(ranking.top(10).len(), 3);
    }

    #[test]
    fn test_empty_collection() {
        let ranking = Ranker::default().rank(&[]);
        assert!(ranking.best.is_none());
        assert!(ranking.worst.is_none());
        assert!(ranking.top(5).is_empty());
    }

    #[test]
    fn test_rank_does_not_depend_on_order() {
        let mut campaigns = vec![
            summary("a", 10.0, 30.0),
            summary("b", 30.0, 90.0),
            summary("c", 20.0, 10.0),
            summary("d", 0.0, 0.0),
        ];
        let forward = Ranker::default().rank(&campaigns);
        let (best, worst, order) = (
            forward.best.unwrap().summary.campaign_id.clone(),
            forward.worst.unwrap().summary.campaign_id.clone(),
            ids(&forward.ordered),
        );

        campaigns.reverse();
        let backward = Ranker::default().rank(&campaigns);
        assert_eq!(backward.best.unwrap().summary.campaign_id, best);
        assert_eq!(backward.worst.unwrap().summary.campaign_id, worst);
        assert_eq!(ids(&backward.ordered), order);
        assert_eq!(best, "b");
        assert_eq!(worst, "c");
    }
}
