//! Schema validation: resolves source columns to canonical fields, checks
//! that every required field is present, and synthesizes missing optional
//! fields with zero.

use campaign_core::config::FieldAliases;
use campaign_core::error::{AnalyticsError, AnalyticsResult};
use campaign_core::types::{Field, RawDataset, RawRecord};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Column resolution for one dataset, computed once from its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub mapping: BTreeMap<Field, String>,
    pub synthesized: Vec<Field>,
}

/// A row in the fully populated canonical shape. Values are still untyped;
/// a header column missing from this particular row is `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow {
    pub campaign_id: Value,
    pub impressions: Value,
    pub clicks: Value,
    pub spend: Value,
    pub revenue: Value,
    pub conversions: Value,
}

impl ValidatedRow {
    pub fn get(&self, field: Field) -> &Value {
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

#[derive(Debug, Clone)]
pub struct ValidatedDataset {
    pub schema: ResolvedSchema,
    pub rows: Vec<ValidatedRow>,
}

pub struct SchemaValidator {
    aliases: FieldAliases,
}

impl SchemaValidator {
    pub fn new(aliases: FieldAliases) -> Self {
        Self { aliases }
    }

    /// Resolve the declared column set. Fails with a schema error naming
    /// every required field that has no matching column.
    pub fn resolve(&self, columns: &[String]) -> AnalyticsResult<ResolvedSchema> {
        let mut mapping = BTreeMap::new();
        let mut synthesized = Vec::new();
        let mut missing = Vec::new();

        for field in Field::ALL {
            let found = self
                .aliases
                .for_field(field)
                .iter()
                .find(|alias| columns.iter().any(|c| c == *alias));

            match found {
                Some(column) => {
                    mapping.insert(field, column.clone());
                }
                None if field.is_required() => missing.push(field),
                None => synthesized.push(field),
            }
        }

        if !missing.is_empty() {
            return Err(AnalyticsError::Schema { missing });
        }

        debug!(?mapping, ?synthesized, "Schema resolved");
        Ok(ResolvedSchema {
            mapping,
            synthesized,
        })
    }

    pub fn validate(&self, dataset: &RawDataset) -> AnalyticsResult<ValidatedDataset> {
        let schema = self.resolve(&dataset.columns)?;
        let rows = dataset
            .rows
            .iter()
            .map(|row| Self::shape(&schema, row))
            .collect();
        Ok(ValidatedDataset { schema, rows })
    }

    fn shape(schema: &ResolvedSchema, row: &RawRecord) -> ValidatedRow {
        let value = |field: Field| match schema.mapping.get(&field) {
            Some(column) => row.get(column).cloned().unwrap_or(Value::Null),
            None => Value::from(0),
        };
        ValidatedRow {
            campaign_id: value(Field::CampaignId),
            impressions: value(Field::Impressions),
            clicks: value(Field::Clicks),
            spend: value(Field::Spend),
            revenue: value(Field::Revenue),
            conversions: value(Field::Conversions),
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(FieldAliases::default())
    }
}
