//! Market Pipeline - Core Library
//! Market data ingestion, analysis and decision making

// Public modules
pub mod core;
pub mod feeds;
pub mod analysis;
pub mod decision;
pub mod pipeline;

// Re-exports
pub use crate::core::{Config, Error, Result};
pub use pipeline::Pipeline;
