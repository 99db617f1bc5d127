//! Strategy policies

use crate::core::config::DecisionConfig;
use crate::core::{Action, ActionPlan, Assessment, Error, Result, StrategyPolicy};

/// Thresholds that must all pass before a non-hold action is chosen
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    pub min_profitability: f64,
    pub max_risk: f64,
    /// Margin by which profitability must exceed risk
    pub min_edge: f64,
    pub action: Action,
}

impl ThresholdPolicy {
    pub fn new(min_profitability: f64, max_risk: f64, min_edge: f64, action: Action) -> Self {
        Self {
            min_profitability,
            max_risk,
            min_edge,
            action,
        }
    }

    pub fn from_config(config: &DecisionConfig) -> Self {
        Self::new(
            config.min_profitability,
            config.max_risk,
            config.min_edge,
            Action::new(&config.action),
        )
    }
}

impl StrategyPolicy for ThresholdPolicy {
    fn name(&self) -> &str {
        "threshold"
    }

    fn select(&self, a: &Assessment) -> Result<ActionPlan> {
        check_finite(a)?;

        if a.profitability < self.min_profitability {
            return Ok(ActionPlan::hold(format!(
                "profitability {:.2} below threshold {:.2}",
                a.profitability, self.min_profitability
            )));
        }
        if a.risk_score > self.max_risk {
            return Ok(ActionPlan::hold(format!(
                "risk {:.2} above ceiling {:.2}",
                a.risk_score, self.max_risk
            )));
        }
        if a.edge() < self.min_edge {
            return Ok(ActionPlan::hold(format!(
                "edge {:.2} below required margin {:.2}",
                a.edge(),
                self.min_edge
            )));
        }

        Ok(ActionPlan::new(
            self.action.clone(),
            format!(
                "expected profitability {:.2} at risk {:.2} (edge {:.2})",
                a.profitability,
                a.risk_score,
                a.edge()
            ),
        ))
    }
}

/// Wraps a plain `(profitability, risk) -> action` predicate
pub struct PredicatePolicy<F> {
    name: String,
    predicate: F,
}

impl<F> PredicatePolicy<F>
where
    F: Fn(f64, f64) -> Action + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> StrategyPolicy for PredicatePolicy<F>
where
    F: Fn(f64, f64) -> Action + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn select(&self, a: &Assessment) -> Result<ActionPlan> {
        check_finite(a)?;

        let action = (self.predicate)(a.profitability, a.risk_score);
        let outcome = format!(
            "{} chose {} at profitability {:.2}, risk {:.2}",
            self.name, action, a.profitability, a.risk_score
        );
        Ok(ActionPlan::new(action, outcome))
    }
}

fn check_finite(a: &Assessment) -> Result<()> {
    if a.profitability.is_finite() && a.risk_score.is_finite() {
        Ok(())
    } else {
        Err(Error::Selection(format!(
            "assessment is not finite: profitability {}, risk {}",
            a.profitability, a.risk_score
        )))
    }
}
