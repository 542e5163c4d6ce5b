//! Protection strategy selection and pre-trade risk analysis

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;
use crate::{
    config::ProtectionThresholds,
    errors::{EngineError, EngineResult},
    protection::{default_rules, default_strategies, ProtectionRule, RiskContext, RuleCondition},
    types::{AttackPattern, ProtectionStrategy, RiskAnalysis, StrategyKind, TokenPair},
};

#[derive(Debug, Clone)]
pub struct Selection {
    pub rule: String,
    pub strategy: ProtectionStrategy,
}

pub struct ProtectionStrategySelector {
    rules: Vec<ProtectionRule>,
    strategies: HashMap<StrategyKind, ProtectionStrategy>,
    risky_confidence: u8,
}

impl ProtectionStrategySelector {
    pub fn new(thresholds: &ProtectionThresholds) -> EngineResult<Self> {
        Self::with_catalog(default_rules(thresholds), default_strategies(), thresholds.risky_confidence)
    }

    /// Every rule must name a strategy in the catalog and the table must end
    /// with a rule that always matches.
    pub fn with_catalog(
        rules: Vec<ProtectionRule>,
        strategies: Vec<ProtectionStrategy>,
        risky_confidence: u8,
    ) -> EngineResult<Self> {
        let strategies: HashMap<StrategyKind, ProtectionStrategy> =
            strategies.into_iter().map(|s| (s.kind, s)).collect();

        if let Some(rule) = rules.iter().find(|r| !strategies.contains_key(&r.strategy)) {
            return Err(EngineError::invalid_config(
                "protection.rules",
                format!("rule '{}' references unknown strategy {:?}", rule.name, rule.strategy),
            ));
        }
        if !matches!(rules.last(), Some(r) if r.condition == RuleCondition::Always) {
            return Err(EngineError::invalid_config(
                "protection.rules",
                "table must end with an unconditional rule",
            ));
        }

        Ok(Self {
            rules,
            strategies,
            risky_confidence,
        })
    }

    pub fn rules(&self) -> &[ProtectionRule] {
        &self.rules
    }

    pub fn select(&self, amount: Decimal, confidence: u8, patterns: &[AttackPattern]) -> EngineResult<Selection> {
        let ctx = RiskContext {
            amount,
            confidence,
            patterns,
        };

        let rule = self
            .rules
            .iter()
            .find(|r| r.condition.matches(&ctx))
            .ok_or_else(|| EngineError::invalid_config("protection.rules", "no rule matched"))?;
        let strategy = self.strategies.get(&rule.strategy).cloned().ok_or_else(|| {
            EngineError::invalid_config("protection.strategies", format!("missing {:?}", rule.strategy))
        })?;

        debug!(rule = %rule.name, strategy = %strategy.name, %amount, confidence, "Protection rule matched");
        Ok(Selection {
            rule: rule.name.clone(),
            strategy,
        })
    }

    /// Confidence is the larger of the window activity score and the
    /// strongest recent pattern.
    pub fn analyze_risk(
        &self,
        pair: &TokenPair,
        amount: Decimal,
        activity_score: u8,
        mut recent_patterns: Vec<AttackPattern>,
    ) -> EngineResult<RiskAnalysis> {
        let strongest = recent_patterns.iter().map(|p| p.confidence).max().unwrap_or(0);
        let confidence = activity_score.max(strongest).min(100);
        let selection = self.select(amount, confidence, &recent_patterns)?;

        recent_patterns.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        Ok(RiskAnalysis {
            pair: pair.clone(),
            amount,
            is_risky: confidence > self.risky_confidence,
            confidence,
            activity_score,
            recommended_strategy: selection.strategy,
            matched_rule: selection.rule,
            contributing_patterns: recent_patterns,
        })
    }
}
