//! Market analysis - scoring models and the analyzer

pub mod analyzer;
pub mod models;

pub use analyzer::{Analyzer, ModelScore, ScoredRecord};
pub use models::{LogisticModel, RangeModel, build_model};
