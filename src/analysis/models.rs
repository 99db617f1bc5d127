//! Built-in scoring models

use std::collections::BTreeMap;

use crate::core::config::ModelSpec;
use crate::core::{Error, Metric, Result, ScoreKind, ScoringModel};

/// Single-metric input with an optional pinned unit
#[derive(Debug, Clone)]
struct MetricInput {
    metric: String,
    unit: Option<String>,
}

impl MetricInput {
    fn read(&self, model: &str, metrics: &BTreeMap<String, Metric>) -> Result<Option<f64>> {
        let Some(m) = metrics.get(&self.metric) else {
            return Ok(None);
        };

        if let Some(expected) = &self.unit {
            if !m.unit.eq_ignore_ascii_case(expected) {
                return Err(Error::Analysis(format!(
                    "model '{}' expects {} in '{}', got '{}'",
                    model, self.metric, expected, m.unit
                )));
            }
        }

        Ok(Some(m.value))
    }
}

/// Logistic curve centered on `midpoint`
#[derive(Debug, Clone)]
pub struct LogisticModel {
    name: String,
    kind: ScoreKind,
    input: MetricInput,
    midpoint: f64,
    steepness: f64,
    weight: f64,
}

impl LogisticModel {
    pub fn new(
        name: impl Into<String>,
        kind: ScoreKind,
        metric: impl Into<String>,
        midpoint: f64,
        steepness: f64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            input: MetricInput {
                metric: metric.into(),
                unit: None,
            },
            midpoint,
            steepness,
            weight: 1.0,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.input.unit = Some(unit.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl ScoringModel for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ScoreKind {
        self.kind
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, metrics: &BTreeMap<String, Metric>) -> Result<Option<f64>> {
        let Some(x) = self.input.read(&self.name, metrics)? else {
            return Ok(None);
        };
        Ok(Some(1.0 / (1.0 + (-self.steepness * (x - self.midpoint)).exp())))
    }
}

/// Linear rescale of [min, max] onto [0, 1], clamped
#[derive(Debug, Clone)]
pub struct RangeModel {
    name: String,
    kind: ScoreKind,
    input: MetricInput,
    min: f64,
    max: f64,
    invert: bool,
    weight: f64,
}

impl RangeModel {
    pub fn new(name: impl Into<String>, kind: ScoreKind, metric: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            input: MetricInput {
                metric: metric.into(),
                unit: None,
            },
            min,
            max,
            invert: false,
            weight: 1.0,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.input.unit = Some(unit.into());
        self
    }

    /// Score 1.0 at `min` instead of `max`
    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl ScoringModel for RangeModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ScoreKind {
        self.kind
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, metrics: &BTreeMap<String, Metric>) -> Result<Option<f64>> {
        let Some(x) = self.input.read(&self.name, metrics)? else {
            return Ok(None);
        };
        let scaled = ((x - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        Ok(Some(if self.invert { 1.0 - scaled } else { scaled }))
    }
}

/// Build a model from its declarative spec, rejecting unusable parameters
pub fn build_model(spec: &ModelSpec) -> Result<Box<dyn ScoringModel>> {
    let invalid = |reason: String| Error::Config(format!("model '{}': {}", spec.name(), reason));

    match spec {
        ModelSpec::Logistic {
            name,
            kind,
            metric,
            unit,
            midpoint,
            steepness,
            weight,
        } => {
            check_weight(*weight).map_err(invalid)?;
            if !midpoint.is_finite() || !steepness.is_finite() {
                return Err(invalid("midpoint and steepness must be finite".to_string()));
            }
            let mut model = LogisticModel::new(name, *kind, metric, *midpoint, *steepness).with_weight(*weight);
            if let Some(u) = unit {
                model = model.with_unit(u);
            }
            Ok(Box::new(model))
        }
        ModelSpec::Range {
            name,
            kind,
            metric,
            unit,
            min,
            max,
            invert,
            weight,
        } => {
            check_weight(*weight).map_err(invalid)?;
            if !min.is_finite() || !max.is_finite() || max <= min {
                return Err(invalid(format!("range requires finite min < max, got [{}, {}]", min, max)));
            }
            let mut model = RangeModel::new(name, *kind, metric, *min, *max).with_weight(*weight);
            if let Some(u) = unit {
                model = model.with_unit(u);
            }
            if *invert {
                model = model.inverted();
            }
            Ok(Box::new(model))
        }
    }
}

fn check_weight(weight: f64) -> std::result::Result<(), String> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(format!("weight must be positive, got {}", weight))
    }
}
