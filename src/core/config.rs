//! Configuration - Type-safe, validated config

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::core::{Action, Error, Result, ScoreKind};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,

    /// HTTP transport
    pub http: HttpConfig,

    /// Market data sources
    pub sources: Vec<SourceConfig>,

    /// Scoring models
    pub analysis: AnalysisConfig,

    /// Strategy thresholds and compliance
    pub decision: DecisionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level, used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("market-pipeline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source identifier
    pub id: String,

    /// Endpoint root; defaults to the id itself
    pub base_url: Option<String>,

    /// Credential (loaded from env if not provided)
    pub api_key: Option<String>,
}

impl SourceConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.id)
    }

    /// Environment variable consulted when `api_key` is absent
    pub fn env_key(&self) -> String {
        let id: String = self
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}_API_KEY", id)
    }

    /// Resolve the credential from config or the process environment
    pub fn credential(&self) -> Result<String> {
        self.credential_from(|key| std::env::var(key).ok())
    }

    pub fn credential_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        let var = self.env_key();
        lookup(&var).ok_or_else(|| {
            Error::Config(format!("No api_key for source '{}' and {} is not set", self.id, var))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub models: Vec<ModelSpec>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            models: vec![
                ModelSpec::Logistic {
                    name: "return_momentum".to_string(),
                    kind: ScoreKind::Profitability,
                    metric: "expected_return".to_string(),
                    unit: Some("pct".to_string()),
                    midpoint: 0.0,
                    steepness: 0.5,
                    weight: 1.0,
                },
                ModelSpec::Range {
                    name: "liquidity".to_string(),
                    kind: ScoreKind::Profitability,
                    metric: "volume".to_string(),
                    unit: None,
                    min: 0.0,
                    max: 1_000_000.0,
                    invert: false,
                    weight: 0.5,
                },
                ModelSpec::Range {
                    name: "volatility".to_string(),
                    kind: ScoreKind::Risk,
                    metric: "volatility".to_string(),
                    unit: Some("pct".to_string()),
                    min: 0.0,
                    max: 100.0,
                    invert: false,
                    weight: 1.0,
                },
                ModelSpec::Range {
                    name: "spread".to_string(),
                    kind: ScoreKind::Risk,
                    metric: "spread".to_string(),
                    unit: Some("bps".to_string()),
                    min: 0.0,
                    max: 50.0,
                    invert: false,
                    weight: 0.5,
                },
            ],
        }
    }
}

/// Declarative scoring model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSpec {
    /// 1 / (1 + e^(-steepness * (x - midpoint)))
    Logistic {
        name: String,
        kind: ScoreKind,
        metric: String,
        #[serde(default)]
        unit: Option<String>,
        midpoint: f64,
        steepness: f64,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    /// Linear rescale of [min, max] onto [0, 1]
    Range {
        name: String,
        kind: ScoreKind,
        metric: String,
        #[serde(default)]
        unit: Option<String>,
        min: f64,
        max: f64,
        #[serde(default)]
        invert: bool,
        #[serde(default = "default_weight")]
        weight: f64,
    },
}

fn default_weight() -> f64 {
    1.0
}

impl ModelSpec {
    pub fn name(&self) -> &str {
        match self {
            ModelSpec::Logistic { name, .. } | ModelSpec::Range { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Minimum profitability before acting (0.0-1.0)
    pub min_profitability: f64,

    /// Maximum tolerated risk (0.0-1.0)
    pub max_risk: f64,

    /// Required margin of profitability over risk
    pub min_edge: f64,

    /// Action taken when every threshold passes
    pub action: String,

    /// Permitted non-hold actions (empty = allow all)
    pub allowed_actions: Vec<String>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            min_profitability: 0.6,
            max_risk: 0.4,
            min_edge: 0.2,
            action: "enter".to_string(),
            allowed_actions: vec![],
        }
    }
}

impl Config {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config {}: {}", path.display(), e)))?;

        Self::from_toml(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Get source config by ID
    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(Error::Config("Source id must not be empty".to_string()));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(Error::Config(format!("Duplicate source id '{}'", source.id)));
            }
            if source.base_url().trim().is_empty() {
                return Err(Error::Config(format!("Source '{}' has an empty base_url", source.id)));
            }
        }

        let d = &self.decision;
        for (field, value) in [
            ("min_profitability", d.min_profitability),
            ("max_risk", d.max_risk),
            ("min_edge", d.min_edge),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("decision.{} must be within [0, 1], got {}", field, value)));
            }
        }
        if d.action.trim().is_empty() {
            return Err(Error::Config("decision.action must not be empty".to_string()));
        }
        let action = Action::new(d.action.as_str());
        if !d.allowed_actions.is_empty() && !d.allowed_actions.iter().any(|a| Action::new(a.as_str()) == action) {
            return Err(Error::Config(format!(
                "decision.action '{}' is not in decision.allowed_actions",
                action
            )));
        }

        Ok(())
    }
}
