use serde::Deserialize;
use std::path::Path;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::types::{Direction, Field, RankingMetric, SummaryOrder};

/// Environment prefix for overrides, e.g.
/// `CAMPAIGN_ANALYTICS__RANKING__METRIC=ctr`.
pub const ENV_PREFIX: &str = "CAMPAIGN_ANALYTICS";

/// Root analytics configuration. Loaded from an optional TOML/JSON/YAML file
/// and environment variables with the prefix `CAMPAIGN_ANALYTICS__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub metric: RankingMetric,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub aliases: FieldAliases,
}

/// Source column names accepted for each canonical field, in priority order.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldAliases {
    #[serde(default = "default_campaign_id_aliases")]
    pub campaign_id: Vec<String>,
    #[serde(default = "default_impressions_aliases")]
    pub impressions: Vec<String>,
    #[serde(default = "default_clicks_aliases")]
    pub clicks: Vec<String>,
    #[serde(default = "default_spend_aliases")]
    pub spend: Vec<String>,
    #[serde(default = "default_revenue_aliases")]
    pub revenue: Vec<String>,
    #[serde(default = "default_conversions_aliases")]
    pub conversions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// Characters removed from text values before numeric parsing.
    #[serde(default = "default_currency_symbols")]
    pub currency_symbols: String,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: char,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub order: SummaryOrder,
}

// Default functions
fn default_top_n() -> usize {
    5
}
fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
fn default_campaign_id_aliases() -> Vec<String> {
    aliases(&["campaign_id", "Campaign_ID", "campaign", "Campaign"])
}
fn default_impressions_aliases() -> Vec<String> {
    aliases(&["impressions", "Impressions", "views", "Views"])
}
fn default_clicks_aliases() -> Vec<String> {
    aliases(&["clicks", "Clicks", "click_count"])
}
fn default_spend_aliases() -> Vec<String> {
    aliases(&["spend", "Spend", "Acquisition_Cost", "cost", "Cost"])
}
fn default_revenue_aliases() -> Vec<String> {
    aliases(&["revenue", "Revenue", "sales", "conversion_value"])
}
fn default_conversions_aliases() -> Vec<String> {
    aliases(&["conversions", "Conversions", "acquisitions"])
}
fn default_currency_symbols() -> String {
    "$€£".to_string()
}
fn default_thousands_separator() -> char {
    ','
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            metric: RankingMetric::default(),
            direction: Direction::default(),
            top_n: default_top_n(),
        }
    }
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            campaign_id: default_campaign_id_aliases(),
            impressions: default_impressions_aliases(),
            clicks: default_clicks_aliases(),
            spend: default_spend_aliases(),
            revenue: default_revenue_aliases(),
            conversions: default_conversions_aliases(),
        }
    }
}

impl FieldAliases {
    pub fn for_field(&self, field: Field) -> &[String] {
        match field {
            Field::CampaignId => &self.campaign_id,
            Field::Impressions => &self.impressions,
            Field::Clicks => &self.clicks,
            Field::Spend => &self.spend,
            Field::Revenue => &self.revenue,
            Field::Conversions => &self.conversions,
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            currency_symbols: default_currency_symbols(),
            thousands_separator: default_thousands_separator(),
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from an optional file, then environment variables.
    pub fn load(path: Option<&Path>) -> AnalyticsResult<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`AnalyticsConfig::load`], reading overrides from
    /// `<prefix>__SECTION__KEY` variables.
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> AnalyticsResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let mut env = config::Environment::with_prefix(prefix)
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for field in Field::ALL {
            env = env.with_list_parse_key(&format!("schema.aliases.{}", field.as_str()));
        }

        let config: AnalyticsConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        for field in Field::ALL {
            if field.is_required() && self.schema.aliases.for_field(field).is_empty() {
                return Err(AnalyticsError::Config(format!(
                    "no column aliases configured for required field '{field}'"
                )));
            }
        }
        if self
            .normalizer
            .currency_symbols
            .contains(|c: char| c.is_ascii_digit() || c == '.' || c == '-')
        {
            return Err(AnalyticsError::Config(
                "currency symbols must not contain digits, '.' or '-'".into(),
            ));
        }
        let separator = self.normalizer.thousands_separator;
        if separator.is_ascii_digit()
            || separator.is_whitespace()
            || matches!(separator, '.' | '-' | '+')
        {
            return Err(AnalyticsError::Config(format!(
                "thousands separator {separator:?} would change the meaning of numbers"
            )));
        }
        if self.normalizer.currency_symbols.contains(separator) {
            return Err(AnalyticsError::Config(format!(
                "thousands separator {separator:?} is also listed as a currency symbol"
            )));
        }
        Ok(())
    }
}
