//! Decision engine - analysis, strategy selection, compliance

use tracing::{error, info, warn};

use crate::analysis::Analyzer;
use crate::core::{
    ActionPlan, Assessment, ComplianceRule, Config, MetricRecord, Result, StrategyPolicy,
};

use super::compliance::ActionAllowList;
use super::policy::ThresholdPolicy;

/// Turns metric records into action plans
pub struct DecisionEngine {
    analyzer: Analyzer,
    policy: Box<dyn StrategyPolicy>,
    compliance: Vec<Box<dyn ComplianceRule>>,
    span: tracing::Span,
}

impl DecisionEngine {
    pub fn new(analyzer: Analyzer, policy: Box<dyn StrategyPolicy>) -> Self {
        Self {
            analyzer,
            policy,
            compliance: vec![],
            span: tracing::info_span!("decision"),
        }
    }

    /// Threshold policy plus an allow-list when one is configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let analyzer = Analyzer::from_config(&config.analysis)?;
        let mut engine = Self::new(analyzer, Box::new(ThresholdPolicy::from_config(&config.decision)));

        if !config.decision.allowed_actions.is_empty() {
            engine = engine.with_rule(ActionAllowList::new(config.decision.allowed_actions.iter().cloned()));
        }
        Ok(engine)
    }

    pub fn with_rule(mut self, rule: impl ComplianceRule + 'static) -> Self {
        self.compliance.push(Box::new(rule));
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Analyze the record and pick a compliant plan
    pub fn execute(&self, record: MetricRecord) -> Result<ActionPlan> {
        let result = self
            .analyzer
            .analyze(&record)
            .and_then(|assessment| self.determine_strategy(&assessment));

        let _enter = self.span.enter();
        match &result {
            Ok(plan) => info!(
                policy = self.policy.name(),
                action = %plan.action,
                "Executing chosen strategy: {}",
                plan.expected_outcome
            ),
            Err(e) => error!("Error executing strategy: {}", e),
        }
        result
    }

    /// Policy selection followed by the compliance gate
    pub fn determine_strategy(&self, assessment: &Assessment) -> Result<ActionPlan> {
        let plan = self.policy.select(assessment)?;
        if plan.action.is_no_action() {
            return Ok(plan);
        }

        if let Some(rule) = self
            .compliance
            .iter()
            .find(|r| !r.permits(&plan.action, assessment))
        {
            let _enter = self.span.enter();
            warn!(rule = rule.name(), action = %plan.action, "Action blocked by compliance");
            return Ok(ActionPlan::hold(format!(
                "{} blocked by compliance rule '{}'",
                plan.action,
                rule.name()
            )));
        }

        Ok(plan)
    }
}
