//! Fixed-fractional position sizing.
//!
//! contracts = min(floor(account_size * max_risk_fraction / max_loss), position_cap)
//!
//! Risks at most `max_risk_fraction` of the account on one trade, assuming
//! the whole premium can be lost. Pure function.

use crate::config::SizingConfig;
use crate::types::RiskMetrics;

#[derive(Debug, Clone, Copy)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: &SizingConfig) -> Self {
        Self { config: *config }
    }

    /// Contracts to buy given a per-contract worst case.
    /// Non-positive or non-finite `max_loss` sizes to zero.
    #[inline]
    pub fn contracts_for_loss(&self, max_loss: f64) -> u32 {
        if !max_loss.is_finite() || max_loss <= 0.0 {
            return 0;
        }
        let budget = self.config.account_size * self.config.max_risk_fraction;
        if !budget.is_finite() || budget <= 0.0 {
            return 0;
        }
        let raw = (budget / max_loss).floor();
        let cap = f64::from(self.config.position_cap);
        // `as` saturates, and raw is already bounded by the cap here.
        raw.min(cap) as u32
    }

    #[inline]
    pub fn position_size(&self, risk: &RiskMetrics) -> u32 {
        self.contracts_for_loss(risk.max_loss)
    }

    /// Dollars at risk for `contracts` at `max_loss` each.
    #[inline]
    pub fn capital_at_risk(&self, contracts: u32, max_loss: f64) -> f64 {
        f64::from(contracts) * max_loss.max(0.0)
    }
}
