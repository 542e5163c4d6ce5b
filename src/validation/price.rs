//! Quote sanity checks

use anyhow::Result;
use rust_decimal::Decimal;
use crate::types::{Quote, TokenPair};

pub fn validate_quote(quote: &Quote, expected: &TokenPair) -> Result<()> {
    if quote.pair != *expected {
        return Err(anyhow::anyhow!(
            "{} quoted {} instead of {}", quote.venue_id, quote.pair, expected
        ));
    }

    if quote.price <= Decimal::ZERO {
        return Err(anyhow::anyhow!("{} price is zero or negative: {}", quote.venue_id, quote.price));
    }

    if quote.liquidity < Decimal::ZERO {
        return Err(anyhow::anyhow!("{} liquidity is negative: {}", quote.venue_id, quote.liquidity));
    }

    if quote.fee_bps >= 10_000 {
        return Err(anyhow::anyhow!("{} fee out of range: {} bps", quote.venue_id, quote.fee_bps));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn quote(price: Decimal, liquidity: Decimal) -> Quote {
        Quote {
            venue_id: "v".to_string(),
            pair: TokenPair::new("WETH", "USDC"),
            price,
            liquidity,
            fee_bps: 30,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn rejects_bad_quotes() {
        let pair = TokenPair::new("WETH", "USDC");
        assert!(validate_quote(&quote(dec!(100), dec!(10)), &pair).is_ok());
        assert!(validate_quote(&quote(dec!(0), dec!(10)), &pair).is_err());
        assert!(validate_quote(&quote(dec!(100), dec!(-1)), &pair).is_err());
        assert!(validate_quote(&quote(dec!(100), dec!(10)), &TokenPair::new("WBTC", "USDC")).is_err());
    }
}
