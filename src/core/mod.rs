//! Core module - Records, collaborator traits, config, and errors

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{Config, ModelSpec};
pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
