//! Campaign performance analytics: schema validation, field normalization,
//! ratio metric derivation, campaign aggregation, and best/worst ranking.

pub mod aggregator;
pub mod deriver;
pub mod normalizer;
pub mod pipeline;
pub mod ranker;
pub mod schema;

pub use normalizer::FieldNormalizer;
pub use pipeline::AnalyticsPipeline;
pub use ranker::{Ranker, Ranking};
pub use schema::SchemaValidator;
