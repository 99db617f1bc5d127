//! Market data feeds - REST ingestion and normalization

pub mod collector;
pub mod rest_client;

pub use collector::{Collector, FetchRequest, Source, parse_payload, validate_metrics};
pub use rest_client::ReqwestHttpClient;
