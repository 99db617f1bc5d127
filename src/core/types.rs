//! Core types - Strong typing at every stage boundary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar leaf of an untrusted payload. Numbers keep their JSON form until coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/// Raw, source-defined payload. Shape is untrusted until converted.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Mapping(BTreeMap<String, RawPayload>),
    List(Vec<RawPayload>),
    Scalar(Scalar),
    Null,
}

impl RawPayload {
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, RawPayload>> {
        match self {
            RawPayload::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Short shape name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            RawPayload::Mapping(_) => "mapping",
            RawPayload::List(_) => "list",
            RawPayload::Scalar(Scalar::Bool(_)) => "bool",
            RawPayload::Scalar(Scalar::Number(_)) => "number",
            RawPayload::Scalar(Scalar::Text(_)) => "text",
            RawPayload::Null => "null",
        }
    }
}

impl From<serde_json::Value> for RawPayload {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => RawPayload::Null,
            Value::Bool(b) => RawPayload::Scalar(Scalar::Bool(b)),
            Value::Number(n) => RawPayload::Scalar(Scalar::Number(n)),
            Value::String(s) => RawPayload::Scalar(Scalar::Text(s)),
            Value::Array(items) => RawPayload::List(items.into_iter().map(RawPayload::from).collect()),
            Value::Object(map) => RawPayload::Mapping(
                map.into_iter().map(|(k, v)| (k, RawPayload::from(v))).collect(),
            ),
        }
    }
}

impl From<&RawPayload> for serde_json::Value {
    fn from(raw: &RawPayload) -> Self {
        use serde_json::Value;

        match raw {
            RawPayload::Null => Value::Null,
            RawPayload::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            RawPayload::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            RawPayload::Scalar(Scalar::Text(s)) => Value::String(s.clone()),
            RawPayload::List(items) => Value::Array(items.iter().map(Value::from).collect()),
            RawPayload::Mapping(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect())
            }
        }
    }
}

/// One measured quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub value: f64,
    pub unit: String,
}

impl Metric {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self { value, unit: unit.into() }
    }
}

/// Normalized output of the collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Source timestamp, epoch seconds
    pub timestamp: Option<f64>,
    pub metrics: BTreeMap<String, Metric>,
}

impl MetricRecord {
    pub fn new(timestamp: Option<f64>, metrics: BTreeMap<String, Metric>) -> Self {
        Self { timestamp, metrics }
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    /// Timestamp as a UTC instant, if present and representable
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        let ts = self.timestamp?;
        if !ts.is_finite() {
            return None;
        }
        let secs = ts.floor();
        let nanos = ((ts - secs) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }
}

/// Profitability and risk for one record, both in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub profitability: f64,
    pub risk_score: f64,
}

impl Assessment {
    pub fn new(profitability: f64, risk_score: f64) -> Self {
        Self { profitability, risk_score }
    }

    /// Profitability in excess of risk
    pub fn edge(&self) -> f64 {
        self.profitability - self.risk_score
    }
}

/// Action identifier chosen by the decision engine. Deserializing normalizes like `new`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Action(String);

impl Action {
    pub const HOLD: &'static str = "hold";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_lowercase())
    }

    /// The no-action default
    pub fn hold() -> Self {
        Self(Self::HOLD.to_string())
    }

    pub fn is_no_action(&self) -> bool {
        self.0 == Self::HOLD
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Action {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.0
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decision engine output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub action: Action,
    pub expected_outcome: String,
}

impl ActionPlan {
    pub fn new(action: Action, expected_outcome: impl Into<String>) -> Self {
        Self {
            action,
            expected_outcome: expected_outcome.into(),
        }
    }

    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(Action::hold(), reason)
    }
}
