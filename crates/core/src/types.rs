use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AnalyticsError;

// ─── Fields ─────────────────────────────────────────────────────────────────

/// Canonical input fields understood by the analytics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CampaignId,
    Impressions,
    Clicks,
    Spend,
    Revenue,
    Conversions,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::CampaignId,
        Field::Impressions,
        Field::Clicks,
        Field::Spend,
        Field::Revenue,
        Field::Conversions,
    ];

    /// Numeric fields, in the order the normalizer processes them.
    pub const NUMERIC: [Field; 5] = [
        Field::Impressions,
        Field::Clicks,
        Field::Spend,
        Field::Revenue,
        Field::Conversions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::CampaignId => "campaign_id",
            Field::Impressions => "impressions",
            Field::Clicks => "clicks",
            Field::Spend => "spend",
            Field::Revenue => "revenue",
            Field::Conversions => "conversions",
        }
    }

    /// Required fields must be present in the column set; the rest are
    /// synthesized with zero.
    pub fn is_required(&self) -> bool {
        !matches!(self, Field::Revenue | Field::Conversions)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Metrics ────────────────────────────────────────────────────────────────

/// Ratio metrics derived from volume fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// clicks / impressions
    Ctr,
    /// spend / clicks
    Cpc,
    /// spend / conversions
    Cpa,
    /// revenue / spend
    Roas,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Ctr, Metric::Cpc, Metric::Cpa, Metric::Roas];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Ctr => "ctr",
            Metric::Cpc => "cpc",
            Metric::Cpa => "cpa",
            Metric::Roas => "roas",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctr" => Ok(Metric::Ctr),
            "cpc" => Ok(Metric::Cpc),
            "cpa" => Ok(Metric::Cpa),
            "roas" => Ok(Metric::Roas),
            other => Err(AnalyticsError::UnknownMetric(other.to_string())),
        }
    }
}

/// Anything a campaign can be ranked by: a ratio metric or a volume total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    Ctr,
    Cpc,
    Cpa,
    #[default]
    Roas,
    TotalImpressions,
    TotalClicks,
    TotalSpend,
    TotalRevenue,
    TotalConversions,
}

impl RankingMetric {
    /// The ratio metric behind this ranking key, if any. Volume totals are
    /// never undefined.
    pub fn ratio(&self) -> Option<Metric> {
        match self {
            RankingMetric::Ctr => Some(Metric::Ctr),
            RankingMetric::Cpc => Some(Metric::Cpc),
            RankingMetric::Cpa => Some(Metric::Cpa),
            RankingMetric::Roas => Some(Metric::Roas),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMetric::Ctr => "ctr",
            RankingMetric::Cpc => "cpc",
            RankingMetric::Cpa => "cpa",
            RankingMetric::Roas => "roas",
            RankingMetric::TotalImpressions => "total_impressions",
            RankingMetric::TotalClicks => "total_clicks",
            RankingMetric::TotalSpend => "total_spend",
            RankingMetric::TotalRevenue => "total_revenue",
            RankingMetric::TotalConversions => "total_conversions",
        }
    }
}

impl From<Metric> for RankingMetric {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Ctr => RankingMetric::Ctr,
            Metric::Cpc => RankingMetric::Cpc,
            Metric::Cpa => RankingMetric::Cpa,
            Metric::Roas => RankingMetric::Roas,
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingMetric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(metric) = key.parse::<Metric>() {
            return Ok(metric.into());
        }
        match key.trim_start_matches("total_") {
            "impressions" => Ok(RankingMetric::TotalImpressions),
            "clicks" => Ok(RankingMetric::TotalClicks),
            "spend" => Ok(RankingMetric::TotalSpend),
            "revenue" => Ok(RankingMetric::TotalRevenue),
            "conversions" => Ok(RankingMetric::TotalConversions),
            _ => Err(AnalyticsError::UnknownMetric(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    #[serde(alias = "higher")]
    HigherIsBetter,
    #[serde(alias = "lower")]
    LowerIsBetter,
}

impl FromStr for Direction {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "higher" | "higher_is_better" | "desc" => Ok(Direction::HigherIsBetter),
            "lower" | "lower_is_better" | "asc" => Ok(Direction::LowerIsBetter),
            other => Err(AnalyticsError::Config(format!(
                "unknown ranking direction '{other}'"
            ))),
        }
    }
}

/// Output order of the campaign summary sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryOrder {
    #[default]
    FirstSeen,
    CampaignId,
    TotalSpend,
    TotalRevenue,
}

impl FromStr for SummaryOrder {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first_seen" | "insertion" => Ok(SummaryOrder::FirstSeen),
            "campaign_id" | "id" => Ok(SummaryOrder::CampaignId),
            "total_spend" | "spend" => Ok(SummaryOrder::TotalSpend),
            "total_revenue" | "revenue" => Ok(SummaryOrder::TotalRevenue),
            other => Err(AnalyticsError::Config(format!(
                "unknown summary order '{other}'"
            ))),
        }
    }
}

// ─── Raw input ──────────────────────────────────────────────────────────────

/// One untyped row as produced by ingestion.
pub type RawRecord = BTreeMap<String, serde_json::Value>;

/// Rows plus the declared column set they were read with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataset {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawDataset {
    pub fn new(columns: Vec<String>, rows: Vec<RawRecord>) -> Self {
        Self { columns, rows }
    }

    /// Build a dataset whose column set is the union of row keys, in order of
    /// first appearance.
    pub fn from_rows(rows: Vec<RawRecord>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ─── Typed records ──────────────────────────────────────────────────────────

/// A normalized row. Every numeric field is finite and non-negative and the
/// campaign id is trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub campaign_id: String,
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
    pub revenue: f64,
    pub conversions: u64,
}

/// Derived ratio metrics. A metric listed in `undefined_metrics` had a zero
/// denominator and carries the value 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioMetrics {
    pub ctr: f64,
    pub cpc: f64,
    pub cpa: f64,
    pub roas: f64,
    pub undefined_metrics: BTreeSet<Metric>,
}

impl RatioMetrics {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Ctr => self.ctr,
            Metric::Cpc => self.cpc,
            Metric::Cpa => self.cpa,
            Metric::Roas => self.roas,
        }
    }

    pub fn is_undefined(&self, metric: Metric) -> bool {
        self.undefined_metrics.contains(&metric)
    }

    /// Record `metric` as undefined and zero its value.
    pub fn mark_undefined(&mut self, metric: Metric) {
        self.set(metric, 0.0);
        self.undefined_metrics.insert(metric);
    }

    fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Ctr => self.ctr = value,
            Metric::Cpc => self.cpc = value,
            Metric::Cpa => self.cpa = value,
            Metric::Roas => self.roas = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRecord {
    #[serde(flatten)]
    pub record: CleanRecord,
    #[serde(flatten)]
    pub metrics: RatioMetrics,
}

/// Per-campaign aggregate. Ratios are derived from the summed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub campaign_id: String,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_spend: f64,
    pub total_revenue: f64,
    pub total_conversions: u64,
    pub row_count: usize,
    #[serde(flatten)]
    pub metrics: RatioMetrics,
}

impl CampaignSummary {
    /// Value of a ranking key; `None` when the underlying ratio is undefined.
    pub fn ranking_value(&self, metric: RankingMetric) -> Option<f64> {
        if let Some(ratio) = metric.ratio() {
            if self.metrics.is_undefined(ratio) {
                return None;
            }
            return Some(self.metrics.get(ratio));
        }
        Some(match metric {
            RankingMetric::TotalImpressions => self.total_impressions as f64,
            RankingMetric::TotalClicks => self.total_clicks as f64,
            RankingMetric::TotalSpend => self.total_spend,
            RankingMetric::TotalRevenue => self.total_revenue,
            RankingMetric::TotalConversions => self.total_conversions as f64,
            _ => 0.0,
        })
    }
}

/// Points at a summary by its position in the report's campaign list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRef {
    pub index: usize,
    pub campaign_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub campaign_count: usize,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_spend: f64,
    pub total_revenue: f64,
    pub total_conversions: u64,
    #[serde(flatten)]
    pub metrics: RatioMetrics,
    pub ranked_by: RankingMetric,
    pub direction: Direction,
    pub best: Option<CampaignRef>,
    pub worst: Option<CampaignRef>,
    pub top: Vec<CampaignRef>,
}

// ─── Diagnostics ────────────────────────────────────────────────────────────

/// Non-fatal conditions recovered during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    pub input_rows: usize,
    pub clean_rows: usize,
    pub dropped_rows: usize,
    /// Source column chosen for each canonical field; absent for synthesized
    /// optional fields.
    pub column_mapping: BTreeMap<Field, String>,
    pub synthesized_fields: Vec<Field>,
    pub coercion_fallbacks: BTreeMap<Field, u64>,
    pub clamped_negatives: BTreeMap<Field, u64>,
    pub rows_with_undefined_metrics: usize,
    /// Campaigns whose spend or revenue sum exceeded `f64::MAX`. Such totals
    /// are reported as `f64::MAX` and the ratios reading them are undefined.
    #[serde(default)]
    pub saturated_totals: usize,
}

impl PipelineDiagnostics {
    pub fn total_coercion_fallbacks(&self) -> u64 {
        self.coercion_fallbacks.values().sum()
    }

    pub fn total_clamped(&self) -> u64 {
        self.clamped_negatives.values().sum()
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Durable output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub campaigns: Vec<CampaignSummary>,
    pub overall: OverallSummary,
    pub diagnostics: PipelineDiagnostics,
}

impl PerformanceReport {
    pub fn best_campaign(&self) -> Option<&CampaignSummary> {
        self.resolve(self.overall.best.as_ref())
    }

    pub fn worst_campaign(&self) -> Option<&CampaignSummary> {
        self.resolve(self.overall.worst.as_ref())
    }

    pub fn top_campaigns(&self) -> Vec<&CampaignSummary> {
        self.overall
            .top
            .iter()
            .filter_map(|r| self.resolve(Some(r)))
            .collect()
    }

    pub fn campaign(&self, campaign_id: &str) -> Option<&CampaignSummary> {
        self.campaigns.iter().find(|c| c.campaign_id == campaign_id)
    }

    fn resolve(&self, reference: Option<&CampaignRef>) -> Option<&CampaignSummary> {
        let reference = reference?;
        self.campaigns
            .get(reference.index)
            .filter(|c| c.campaign_id == reference.campaign_id)
    }
}
