//! Decision making - strategy policies, compliance, and the engine

pub mod compliance;
pub mod engine;
pub mod policy;

pub use compliance::ActionAllowList;
pub use engine::DecisionEngine;
pub use policy::{PredicatePolicy, ThresholdPolicy};
