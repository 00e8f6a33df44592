//! Risk/reward profile of a single long option.
//!
//! long call: max_loss = premium, max_profit = +inf,       breakeven = K + premium
//! long put:  max_loss = premium, max_profit = K - premium, breakeven = K - premium
//!
//! prob_profit          = 1 - |delta|
//! risk_adjusted_return = (max_profit - max_loss) * prob_profit / max_loss
//!
//! Pure function. Failures return the all-zero record (max_profit = 0, not
//! +inf), which callers must read as "unavailable".

use crate::errors::{AnalyticsError, Computed, EngineResult};
use crate::types::{ContractSnapshot, Greeks, OptionType, RiskMetrics};

pub fn compute_risk_metrics(contract: &ContractSnapshot, greeks: &Greeks) -> Computed<RiskMetrics> {
    match try_risk_metrics(contract, greeks) {
        Ok(metrics) => Computed::ok(metrics),
        Err(e) => Computed::fallback(RiskMetrics::default(), e),
    }
}

fn try_risk_metrics(contract: &ContractSnapshot, greeks: &Greeks) -> EngineResult<RiskMetrics> {
    if !greeks.delta.is_finite() {
        return Err(AnalyticsError::Degenerate("delta is not finite".into()));
    }

    let strike = contract.strike();
    let premium = contract.last_price();

    let (max_profit, breakeven) = match contract.option_type() {
        OptionType::Call => (f64::INFINITY, strike + premium),
        OptionType::Put => (strike - premium, strike - premium),
    };
    let max_loss = premium;

    // Delta magnitude as a rough probability proxy.
    let prob_profit = (1.0 - greeks.delta.abs()).clamp(0.0, 1.0);

    let risk_adjusted_return = if max_loss <= 0.0 {
        0.0
    } else if max_profit.is_infinite() {
        // Unbounded upside: report +inf for threshold comparison only.
        if prob_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        (max_profit - max_loss) * prob_profit / max_loss
    };

    if !breakeven.is_finite() || risk_adjusted_return.is_nan() {
        return Err(AnalyticsError::Degenerate(format!(
            "risk metrics undefined for strike={strike} premium={premium}"
        )));
    }

    Ok(RiskMetrics {
        max_profit,
        max_loss,
        breakeven,
        prob_profit,
        risk_adjusted_return,
    })
}
