//! Shared domain model for campaign analytics: typed records, ratio
//! metrics, configuration, and the error taxonomy.

pub mod config;
pub mod error;
pub mod types;

pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, AnalyticsResult};
