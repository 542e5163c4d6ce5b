//! Data-driven protection rule table and strategy catalog

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use crate::{
    config::ProtectionThresholds,
    types::{AttackPattern, AttackType, ProtectionStrategy, StrategyKind},
};

/// Inputs a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RiskContext<'a> {
    pub amount: Decimal,
    pub confidence: u8,
    pub patterns: &'a [AttackPattern],
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleCondition {
    AmountAbove(Decimal),
    ConfidenceAbove(u8),
    /// A pattern of this type with confidence strictly above the threshold.
    PatternAbove { attack_type: AttackType, confidence: u8 },
    PatternPresent(AttackType),
    AnyOf(Vec<RuleCondition>),
    Always,
}

impl RuleCondition {
    pub fn matches(&self, ctx: &RiskContext<'_>) -> bool {
        match self {
            RuleCondition::AmountAbove(limit) => ctx.amount > *limit,
            RuleCondition::ConfidenceAbove(limit) => ctx.confidence > *limit,
            RuleCondition::PatternAbove { attack_type, confidence } => ctx
                .patterns
                .iter()
                .any(|p| p.attack_type == *attack_type && p.confidence > *confidence),
            RuleCondition::PatternPresent(attack_type) => {
                ctx.patterns.iter().any(|p| p.attack_type == *attack_type)
            }
            RuleCondition::AnyOf(conditions) => conditions.iter().any(|c| c.matches(ctx)),
            RuleCondition::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionRule {
    pub name: String,
    pub condition: RuleCondition,
    pub strategy: StrategyKind,
}

impl ProtectionRule {
    pub fn new(name: &str, condition: RuleCondition, strategy: StrategyKind) -> Self {
        Self {
            name: name.to_string(),
            condition,
            strategy,
        }
    }
}

/// Ordered table, first match wins. The last rule always matches.
pub fn default_rules(thresholds: &ProtectionThresholds) -> Vec<ProtectionRule> {
    vec![
        ProtectionRule::new(
            "large_or_high_confidence",
            RuleCondition::AnyOf(vec![
                RuleCondition::AmountAbove(thresholds.max_protection_amount),
                RuleCondition::ConfidenceAbove(thresholds.max_protection_confidence),
            ]),
            StrategyKind::MaximumProtection,
        ),
        ProtectionRule::new(
            "sandwich_threat",
            RuleCondition::PatternAbove {
                attack_type: AttackType::Sandwich,
                confidence: thresholds.bundle_sandwich_confidence,
            },
            StrategyKind::BundledSubmission,
        ),
        ProtectionRule::new(
            "jit_liquidity_present",
            RuleCondition::PatternPresent(AttackType::JitLiquidity),
            StrategyKind::JitGuard,
        ),
        ProtectionRule::new(
            "elevated_confidence",
            RuleCondition::ConfidenceAbove(thresholds.stealth_delay_confidence),
            StrategyKind::DelayedStealth,
        ),
        ProtectionRule::new("default", RuleCondition::Always, StrategyKind::Stealth),
    ]
}

pub fn default_strategies() -> Vec<ProtectionStrategy> {
    vec![
        ProtectionStrategy {
            kind: StrategyKind::MaximumProtection,
            name: "Maximum protection".to_string(),
            effectiveness: dec!(0.98),
            cost_multiplier: dec!(2.0),
            delay_blocks: 0,
            uses_private_channel: true,
            applicability: "Large trades or confirmed hostile activity: private bundle with split execution"
                .to_string(),
        },
        ProtectionStrategy {
            kind: StrategyKind::BundledSubmission,
            name: "Bundled submission".to_string(),
            effectiveness: dec!(0.92),
            cost_multiplier: dec!(1.5),
            delay_blocks: 0,
            uses_private_channel: true,
            applicability: "Active sandwich attackers: atomic bundle through a private relay".to_string(),
        },
        ProtectionStrategy {
            kind: StrategyKind::JitGuard,
            name: "JIT guard".to_string(),
            effectiveness: dec!(0.85),
            cost_multiplier: dec!(1.3),
            delay_blocks: 1,
            uses_private_channel: true,
            applicability: "JIT liquidity seen: tight slippage bounds and liquidity checks at execution"
                .to_string(),
        },
        ProtectionStrategy {
            kind: StrategyKind::DelayedStealth,
            name: "Delayed stealth".to_string(),
            effectiveness: dec!(0.75),
            cost_multiplier: dec!(1.2),
            delay_blocks: 2,
            uses_private_channel: true,
            applicability: "Elevated activity without a direct threat: randomized delay, private submission"
                .to_string(),
        },
        ProtectionStrategy {
            kind: StrategyKind::Stealth,
            name: "Stealth".to_string(),
            effectiveness: dec!(0.6),
            cost_multiplier: dec!(1.05),
            delay_blocks: 0,
            uses_private_channel: false,
            applicability: "Quiet conditions: standard submission with conservative slippage".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use alloy::primitives::Address;
    use chrono::Utc;

    fn pattern(attack_type: AttackType, confidence: u8) -> AttackPattern {
        AttackPattern {
            attack_type,
            confidence,
            attacker: Address::ZERO,
            victim: None,
            profit_estimate: Decimal::ZERO,
            evidence: vec![],
            block_number: 1,
            detected_at: Utc::now(),
        }
    }

    fn context(patterns: &[AttackPattern]) -> RiskContext<'_> {
        RiskContext { amount: dec!(1), confidence: 0, patterns }
    }

    #[test]
    fn pattern_threshold_is_strict() {
        let at_threshold = [pattern(AttackType::Sandwich, 60)];
        let above = [pattern(AttackType::Sandwich, 61)];
        let cond = RuleCondition::PatternAbove { attack_type: AttackType::Sandwich, confidence: 60 };

        assert!(!cond.matches(&context(&at_threshold)));
        assert!(cond.matches(&context(&above)));
    }

    #[test]
    fn every_rule_has_a_strategy() {
        let rules = default_rules(&Config::default().protection);
        let catalog = default_strategies();
        assert!(rules.iter().all(|r| catalog.iter().any(|s| s.kind == r.strategy)));
        assert_eq!(rules.last().map(|r| &r.condition), Some(&RuleCondition::Always));
    }
}
