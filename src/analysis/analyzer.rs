//! Market analyzer - applies scoring models and derives an assessment

use std::collections::HashSet;
use tracing::{error, info};

use crate::core::config::AnalysisConfig;
use crate::core::{Assessment, Error, MetricRecord, Result, ScoreKind, ScoringModel};

use super::models::build_model;

/// One model's contribution to a record
#[derive(Debug, Clone, PartialEq)]
pub struct ModelScore {
    pub model: String,
    pub kind: ScoreKind,
    pub weight: f64,
    pub score: f64,
}

/// Model outputs for one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredRecord {
    pub scores: Vec<ModelScore>,
}

impl ScoredRecord {
    /// Weighted mean of one kind's scores, `None` if no model contributed
    pub fn weighted_mean(&self, kind: ScoreKind) -> Option<f64> {
        let (sum, weights) = self
            .scores
            .iter()
            .filter(|s| s.kind == kind)
            .fold((0.0, 0.0), |(sum, w), s| (sum + s.score * s.weight, w + s.weight));

        (weights > 0.0).then(|| sum / weights)
    }
}

/// Analyzer holding models loaded once at construction
pub struct Analyzer {
    models: Vec<Box<dyn ScoringModel>>,
    span: tracing::Span,
}

impl Analyzer {
    pub fn new(models: Vec<Box<dyn ScoringModel>>) -> Result<Self> {
        let span = tracing::info_span!("analyzer");

        let mut names = HashSet::new();
        for model in &models {
            if !names.insert(model.name().to_string()) {
                return Err(Error::Config(format!("Duplicate model name '{}'", model.name())));
            }
            let w = model.weight();
            if !(w.is_finite() && w > 0.0) {
                return Err(Error::Config(format!("Model '{}' has non-positive weight {}", model.name(), w)));
            }
        }

        span.in_scope(|| info!("Loading market analysis models: {}", models.len()));
        Ok(Self { models, span })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let models = config
            .models
            .iter()
            .map(build_model)
            .collect::<Result<Vec<_>>>()?;
        Self::new(models)
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name())
    }

    /// Score one record. Model errors propagate unchanged.
    pub fn analyze(&self, record: &MetricRecord) -> Result<Assessment> {
        let _enter = self.span.enter();

        let result = self
            .apply_models(record)
            .map(|scored| Assessment::new(calculate_profitability(&scored), evaluate_risk(&scored)));

        match &result {
            Ok(a) => info!(
                profitability = a.profitability,
                risk_score = a.risk_score,
                "Market analysis completed successfully"
            ),
            Err(e) => error!("Error in market analysis: {}", e),
        }
        result
    }

    /// Apply every model to the record's metrics
    pub fn apply_models(&self, record: &MetricRecord) -> Result<ScoredRecord> {
        let mut scored = ScoredRecord::default();

        for model in &self.models {
            let Some(score) = model.score(&record.metrics)? else {
                continue;
            };
            if !score.is_finite() {
                return Err(Error::Analysis(format!(
                    "model '{}' produced non-finite score {}",
                    model.name(),
                    score
                )));
            }
            scored.scores.push(ModelScore {
                model: model.name().to_string(),
                kind: model.kind(),
                weight: model.weight(),
                score: score.clamp(0.0, 1.0),
            });
        }

        Ok(scored)
    }
}

/// No profitability evidence means no profitability
fn calculate_profitability(scored: &ScoredRecord) -> f64 {
    scored.weighted_mean(ScoreKind::Profitability).unwrap_or(0.0)
}

/// Unknown risk is treated as maximal
fn evaluate_risk(scored: &ScoredRecord) -> f64 {
    scored.weighted_mean(ScoreKind::Risk).unwrap_or(1.0)
}
