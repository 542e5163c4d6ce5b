//! Revalidation of derived opportunities against fresh quotes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::{
    types::{AggregatedQuote, ArbitrageOpportunity, ValidationResult},
    utils::spread_pct,
};

/// Opportunities are advisory; this must pass against the latest aggregate
/// before the opportunity is acted on.
pub fn revalidate_opportunity(
    opp: &ArbitrageOpportunity,
    latest: &AggregatedQuote,
    now: DateTime<Utc>,
    tolerance_pct: Decimal,
) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut all_good = true;

    result.not_expired = !opp.is_expired(now);
    if !result.not_expired {
        result.warnings.push(format!("Opportunity expired at {}", opp.expires_at()));
        all_good = false;
    }

    let buy = latest.quote_for(&opp.buy_venue);
    let sell = latest.quote_for(&opp.sell_venue);
    result.venues_present = buy.is_some() && sell.is_some() && latest.pair == opp.pair;

    match (buy, sell) {
        (Some(buy), Some(sell)) if result.venues_present => {
            let buy_drift = spread_pct(opp.buy_price.min(buy.price), opp.buy_price.max(buy.price));
            let sell_drift = spread_pct(opp.sell_price.min(sell.price), opp.sell_price.max(sell.price));
            result.prices_within_tolerance = buy_drift <= tolerance_pct && sell_drift <= tolerance_pct;
            if !result.prices_within_tolerance {
                result.warnings.push(format!(
                    "Prices moved: buy {:.4}% sell {:.4}% (tolerance {}%)",
                    buy_drift, sell_drift, tolerance_pct
                ));
                all_good = false;
            }

            result.spread_still_positive = sell.price > buy.price;
            if !result.spread_still_positive {
                result.warnings.push(format!(
                    "Spread closed: buy {} >= sell {}", buy.price, sell.price
                ));
                all_good = false;
            }
        }
        _ => {
            result.warnings.push("Buy or sell venue missing from latest quotes".to_string());
            all_good = false;
        }
    }

    result.all_passed = all_good;
    result
}
