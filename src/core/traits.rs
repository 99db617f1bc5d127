//! Core traits - Seams between the pipeline and its collaborators

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{Action, ActionPlan, Assessment, Metric, Result};

/// Outgoing GET request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

/// Status and raw body of a response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport used by the collector
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a single GET. Non-success statuses are returned, not raised.
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Which assessment score a model feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Profitability,
    Risk,
}

impl std::fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreKind::Profitability => write!(f, "profitability"),
            ScoreKind::Risk => write!(f, "risk"),
        }
    }
}

/// Scoring model applied by the analyzer. Read-only once loaded.
pub trait ScoringModel: Send + Sync {
    /// Unique model name
    fn name(&self) -> &str;

    fn kind(&self) -> ScoreKind;

    /// Relative weight within its kind, always positive
    fn weight(&self) -> f64 {
        1.0
    }

    /// Score in [0, 1], or `None` when the model's inputs are absent
    fn score(&self, metrics: &BTreeMap<String, Metric>) -> Result<Option<f64>>;
}

/// Strategy selection: turns an assessment into a plan
pub trait StrategyPolicy: Send + Sync {
    fn name(&self) -> &str;

    fn select(&self, assessment: &Assessment) -> Result<ActionPlan>;
}

/// Compliance rule applied to every selected action
pub trait ComplianceRule: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `action` may be taken given `assessment`
    fn permits(&self, action: &Action, assessment: &Assessment) -> bool;
}
