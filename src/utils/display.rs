//! Display and printing utilities

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};
use crate::{
    cache::CacheStats,
    types::{ArbitrageOpportunity, AttackPattern, CrossChainOpportunity, RiskAnalysis, VenueHealth},
};

/// Counters accumulated over one engine run.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub started: Instant,
    pub price_cycles: u64,
    pub detection_cycles: u64,
    pub total_opportunities: u64,
    pub cross_chain_opportunities: u64,
    pub total_potential_profit: Decimal,
    pub patterns_detected: u64,
    pub error_counts: HashMap<String, u32>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            price_cycles: 0,
            detection_cycles: 0,
            total_opportunities: 0,
            cross_chain_opportunities: 0,
            total_potential_profit: Decimal::ZERO,
            patterns_detected: 0,
            error_counts: HashMap::new(),
        }
    }
}

impl SessionStats {
    pub fn record_error(&mut self, kind: &str) {
        *self.error_counts.entry(kind.to_string()).or_insert(0) += 1;
    }
}

pub fn print_session_stats(stats: &SessionStats, venues: &[VenueHealth], cache: &CacheStats) {
    let runtime = stats.started.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   📈 ARBITRAGE:");
    info!("     Price cycles: {}", stats.price_cycles);
    info!("     Opportunities scored: {}", stats.total_opportunities);
    info!("     Cross-chain routes: {}", stats.cross_chain_opportunities);
    info!("     Total potential profit: ${:.2}", stats.total_potential_profit);

    info!("   🛡️  MEV:");
    info!("     Detection cycles: {}", stats.detection_cycles);
    info!("     Patterns detected: {}", stats.patterns_detected);

    info!("   ⚙️  SYSTEM:");
    for venue in venues {
        info!(
            "     {}: {} (failures: {})",
            venue.venue_id,
            if venue.circuit_open { "OPEN" } else { "CLOSED" },
            venue.consecutive_failures
        );
    }
    info!(
        "     Score cache: {} hits / {} misses ({} held, {} evicted)",
        cache.hits, cache.misses, cache.len, cache.evictions
    );

    if !stats.error_counts.is_empty() {
        info!("     Error summary:");
        for (error_type, count) in stats.error_counts.iter() {
            info!("       {}: {}", error_type, count);
        }
    }

    info!("");
}

pub fn print_arbitrage_opportunity(opportunity: &ArbitrageOpportunity) {
    warn!("\n🎯 ARBITRAGE OPPORTUNITY #{}", opportunity.id);
    warn!("📍 Pair: {}", opportunity.pair);
    warn!("📋 Route: buy on {} → sell on {}", opportunity.buy_venue, opportunity.sell_venue);
    warn!("💰 Profit Analysis:");
    warn!("   Buy Price:  ${:.4}", opportunity.buy_price);
    warn!("   Sell Price: ${:.4}", opportunity.sell_price);
    warn!("   Spread: {:.3}%", opportunity.spread_pct);
    warn!("   Trade Amount: ${:.2}", opportunity.trade_amount);
    warn!("   Gross Profit: ${:.2}", opportunity.gross_profit);
    warn!(
        "   Costs: flashloan ${:.2}, dex ${:.2}, gas ${:.2}, slippage ${:.2}",
        opportunity.costs.flashloan_fee,
        opportunity.costs.dex_fees,
        opportunity.costs.gas_cost,
        opportunity.costs.slippage_cost
    );
    warn!("   Net Profit: ${:.2} ({:.3}% margin)", opportunity.net_profit, opportunity.profit_margin_pct);
    warn!("⚠️  Risk: {}, expires {}", opportunity.risk_level, opportunity.expires_at().format("%H:%M:%S"));
}

pub fn print_cross_chain_opportunity(opportunity: &CrossChainOpportunity) {
    warn!("\n🌉 CROSS-CHAIN OPPORTUNITY #{}", opportunity.base.id);
    warn!("📍 Token: {}", opportunity.base.pair.base);
    warn!("📋 Route: {} → {} via {}", opportunity.source_chain, opportunity.target_chain, opportunity.bridge_protocol);
    warn!("💰 Spread {:.3}%, net ${:.2}", opportunity.base.spread_pct, opportunity.base.net_profit);
    warn!("   Bridge fee ${:.2}, gas ${:.2}", opportunity.bridge_fee, opportunity.cross_chain_gas);
    warn!(
        "⏱️  Transit ~{}s, risk score {:.2}",
        opportunity.transit_time.num_seconds(),
        opportunity.risk_score
    );
}

pub fn print_attack_pattern(pattern: &AttackPattern) {
    warn!(
        "🚨 {} at block {} by {} (confidence {}%, est. profit {:.4})",
        pattern.attack_type,
        pattern.block_number,
        pattern.attacker,
        pattern.confidence,
        pattern.profit_estimate
    );
}

pub fn print_risk_analysis(analysis: &RiskAnalysis) {
    info!("\n🛡️  RISK ANALYSIS {} ${:.2}", analysis.pair, analysis.amount);
    info!(
        "   Risky: {} (confidence {}, activity {})",
        if analysis.is_risky { "YES" } else { "NO" },
        analysis.confidence,
        analysis.activity_score
    );
    info!(
        "   Strategy: {} via rule '{}'",
        analysis.recommended_strategy.name, analysis.matched_rule
    );
    info!("   {}", analysis.recommended_strategy.applicability);
    if !analysis.contributing_patterns.is_empty() {
        info!("   Contributing patterns: {}", analysis.contributing_patterns.len());
    }
}
