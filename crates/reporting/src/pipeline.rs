//! End-to-end analytics pipeline:
//! `Validated → Normalized → Derived → Aggregated → Ranked`.
//!
//! Stages run strictly in that order. A schema or empty-dataset failure
//! aborts the run and nothing partial is returned.

use campaign_core::config::AnalyticsConfig;
use campaign_core::error::{AnalyticsError, AnalyticsResult};
use campaign_core::types::{
    CampaignSummary, OverallSummary, PerformanceReport, PipelineDiagnostics, RawDataset,
    SummaryOrder,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::{aggregate_checked, sort_summaries, VolumeTotals};
use crate::deriver::derive_all;
use crate::normalizer::FieldNormalizer;
use crate::ranker::{Ranker, Ranking};
use crate::schema::SchemaValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Validated,
    Normalized,
    Derived,
    Aggregated,
    Ranked,
}

pub struct AnalyticsPipeline {
    validator: SchemaValidator,
    normalizer: FieldNormalizer,
    ranker: Ranker,
    order: SummaryOrder,
}

impl AnalyticsPipeline {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            validator: SchemaValidator::new(config.schema.aliases.clone()),
            normalizer: FieldNormalizer::new(&config.normalizer),
            ranker: Ranker::new(config.ranking.clone()),
            order: config.output.order,
        }
    }

    pub fn with_order(mut self, order: SummaryOrder) -> Self {
        self.order = order;
        self
    }

    pub fn run(&self, dataset: &RawDataset) -> AnalyticsResult<PerformanceReport> {
        let input_rows = dataset.len();
        if dataset.is_empty() && dataset.columns.is_empty() {
            return Err(AnalyticsError::EmptyDataset {
                input_rows: 0,
                dropped_rows: 0,
            });
        }

        let validated = self.validator.validate(dataset)?;
        stage(PipelineStage::Validated, validated.rows.len());

        let normalized = self.normalizer.normalize(&validated.rows);
        let stats = normalized.stats;
        stage(PipelineStage::Normalized, normalized.records.len());
        if stats.dropped_rows > 0 {
            metrics::counter!("analytics.rows_dropped").increment(stats.dropped_rows as u64);
            warn!(dropped = stats.dropped_rows, "Dropped rows with empty campaign id");
        }
        let fallbacks: u64 = stats.coercion_fallbacks.values().sum();
        if fallbacks > 0 {
            metrics::counter!("analytics.coercion_fallbacks").increment(fallbacks);
            warn!(fallbacks, fields = ?stats.coercion_fallbacks, "Non-numeric values replaced with zero");
        }
        let clamped: u64 = stats.clamped_negatives.values().sum();
        if clamped > 0 {
            metrics::counter!("analytics.values_clamped").increment(clamped);
            warn!(clamped, fields = ?stats.clamped_negatives, "Negative values clamped to zero");
        }

        if normalized.records.is_empty() {
            return Err(AnalyticsError::EmptyDataset {
                input_rows,
                dropped_rows: stats.dropped_rows,
            });
        }
        let clean_rows = normalized.records.len();

        let derived = derive_all(normalized.records);
        let rows_with_undefined_metrics = derived
            .iter()
            .filter(|d| !d.metrics.undefined_metrics.is_empty())
            .count();
        metrics::counter!("analytics.undefined_metrics")
            .increment(rows_with_undefined_metrics as u64);
        stage(PipelineStage::Derived, derived.len());

        let (mut campaigns, saturated_totals) = aggregate_checked(&derived);
        if saturated_totals > 0 {
            metrics::counter!("analytics.saturated_totals").increment(saturated_totals as u64);
            warn!(
                campaigns = saturated_totals,
                "Money totals saturated; dependent ratios left undefined"
            );
        }
        sort_summaries(&mut campaigns, self.order);
        stage(PipelineStage::Aggregated, campaigns.len());

        let ranking = self.ranker.rank(&campaigns);
        let overall = self.overall(&campaigns, &ranking);
        stage(PipelineStage::Ranked, ranking.ordered.len());

        let diagnostics = PipelineDiagnostics {
            input_rows,
            clean_rows,
            dropped_rows: stats.dropped_rows,
            column_mapping: validated.schema.mapping,
            synthesized_fields: validated.schema.synthesized,
            coercion_fallbacks: stats.coercion_fallbacks,
            clamped_negatives: stats.clamped_negatives,
            rows_with_undefined_metrics,
            saturated_totals,
        };

        info!(
            campaigns = campaigns.len(),
            rows = clean_rows,
            best = overall.best.as_ref().map(|r| r.campaign_id.as_str()),
            worst = overall.worst.as_ref().map(|r| r.campaign_id.as_str()),
            ranked_by = %overall.ranked_by,
            "Campaign analytics complete"
        );

        Ok(PerformanceReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            campaigns,
            overall,
            diagnostics,
        })
    }

    fn overall(&self, campaigns: &[CampaignSummary], ranking: &Ranking<'_>) -> OverallSummary {
        let mut totals = VolumeTotals::default();
        for c in campaigns {
            totals.add(
                c.total_impressions,
                c.total_clicks,
                c.total_spend,
                c.total_revenue,
                c.total_conversions,
            );
        }
        let settled = totals.settle();

        OverallSummary {
            campaign_count: campaigns.len(),
            metrics: settled.metrics,
            total_impressions: totals.impressions,
            total_clicks: totals.clicks,
            total_spend: settled.spend,
            total_revenue: settled.revenue,
            total_conversions: totals.conversions,
            ranked_by: ranking.metric,
            direction: ranking.direction,
            best: ranking.best.map(|r| r.to_ref()),
            worst: ranking.worst.map(|r| r.to_ref()),
            top: ranking
                .top(self.ranker.config().top_n)
                .iter()
                .map(|r| r.to_ref())
                .collect(),
        }
    }
}

impl Default for AnalyticsPipeline {
    fn default() -> Self {
        Self::new(&AnalyticsConfig::default())
    }
}

fn stage(stage: PipelineStage, records: usize) {
    debug!(?stage, records, "Pipeline stage complete");
}
