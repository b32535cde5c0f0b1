use thiserror::Error;

use crate::types::Field;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Schema error: missing required field(s) {}", join_fields(.missing))]
    Schema { missing: Vec<Field> },

    #[error("Empty dataset: no usable rows remain ({input_rows} read, {dropped_rows} dropped)")]
    EmptyDataset {
        input_rows: usize,
        dropped_rows: usize,
    },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AnalyticsError {
    /// Fatal pipeline failures as opposed to caller or environment errors.
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            AnalyticsError::Schema { .. } | AnalyticsError::EmptyDataset { .. }
        )
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
