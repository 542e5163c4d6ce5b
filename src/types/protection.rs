//! Execution protection strategies and risk analysis results

use rust_decimal::Decimal;
use serde::Serialize;
use super::{AttackPattern, TokenPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyKind {
    MaximumProtection,
    BundledSubmission,
    JitGuard,
    DelayedStealth,
    Stealth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionStrategy {
    pub kind: StrategyKind,
    pub name: String,
    /// Estimated fraction of attacks prevented, 0..=1.
    pub effectiveness: Decimal,
    pub cost_multiplier: Decimal,
    pub delay_blocks: u32,
    pub uses_private_channel: bool,
    pub applicability: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAnalysis {
    pub pair: TokenPair,
    pub amount: Decimal,
    pub is_risky: bool,
    pub confidence: u8,
    pub activity_score: u8,
    pub recommended_strategy: ProtectionStrategy,
    pub matched_rule: String,
    pub contributing_patterns: Vec<AttackPattern>,
}
