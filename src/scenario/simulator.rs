use crate::config::SimulationConfig;
use crate::errors::{AnalyticsError, Computed};
use crate::scenario::breakeven::find_breakeven_points;
use crate::types::{ContractSnapshot, SimulationResult, Strategy};

/// Terminal payoff simulation over a grid of underlying prices.
///
/// Only single-leg longs are modeled:
///   long_call: max(0, p - K) - premium
///   long_put:  max(0, K - p) - premium
/// Every other archetype returns 0 at each scenario. That is a modeling
/// limit, not a stub.
///
/// max_profit / max_loss are taken over the sampled grid, so a long call's
/// profit is capped at the top scenario (+20% by default) and stays finite.
pub struct ScenarioSimulator {
    config: SimulationConfig,
}

impl ScenarioSimulator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self { config: *config }
    }

    /// Pure function. A non-positive or non-finite `underlying_price` returns
    /// the empty sentinel.
    pub fn simulate(
        &self,
        strategy: Strategy,
        contract: &ContractSnapshot,
        underlying_price: f64,
    ) -> Computed<SimulationResult> {
        if !underlying_price.is_finite() || underlying_price <= 0.0 {
            return Computed::fallback(
                SimulationResult::default(),
                AnalyticsError::InvalidInput(format!(
                    "cannot simulate around underlying price {underlying_price}"
                )),
            );
        }

        let scenarios = price_grid(
            underlying_price * self.config.low_multiple,
            underlying_price * self.config.high_multiple,
            self.config.scenario_count,
        );

        let strike = contract.strike();
        let premium = contract.last_price();
        let pnl: Vec<f64> = scenarios
            .iter()
            .map(|&price| payoff(strategy, strike, premium, price))
            .collect();

        let max_profit = pnl.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_loss = pnl.iter().copied().fold(f64::INFINITY, f64::min);
        if !max_profit.is_finite() || !max_loss.is_finite() {
            return Computed::fallback(
                SimulationResult::default(),
                AnalyticsError::Degenerate("empty or non-finite payoff grid".into()),
            );
        }

        let breakeven_points = find_breakeven_points(&scenarios, &pnl);
        tracing::debug!(
            strategy = %strategy,
            max_profit = max_profit,
            max_loss = max_loss,
            breakevens = breakeven_points.len(),
            "scenario simulation"
        );

        Computed::ok(SimulationResult {
            price_scenarios: scenarios,
            pnl,
            max_profit,
            max_loss,
            breakeven_points,
        })
    }
}

/// Undiscounted terminal P&L of one contract at `price`.
#[inline]
pub fn payoff(strategy: Strategy, strike: f64, premium: f64, price: f64) -> f64 {
    match strategy {
        Strategy::LongCall => (price - strike).max(0.0) - premium,
        Strategy::LongPut => (strike - price).max(0.0) - premium,
        _ => 0.0,
    }
}

/// `count` evenly spaced points from `low` to `high`, both included.
pub fn price_grid(low: f64, high: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![low],
        _ => {
            let step = (high - low) / (count - 1) as f64;
            let mut grid: Vec<f64> = (0..count).map(|i| low + step * i as f64).collect();
            grid[count - 1] = high;
            grid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use crate::types::OptionType;
    use chrono::NaiveDate;

    fn contract(option_type: OptionType) -> ContractSnapshot {
        let as_of = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        let cfg = PricingConfig::default();
        ContractSnapshot::from_days(100.0, 5.0, 0.3, option_type, 30, as_of, &cfg).unwrap()
    }

    fn simulator() -> ScenarioSimulator {
        ScenarioSimulator::new(&SimulationConfig::default())
    }

    #[test]
    fn test_grid_shape() {
        let grid = price_grid(80.0, 120.0, 100);
        assert_eq!(grid.len(), 100);
        assert_eq!(grid[0], 80.0);
        assert_eq!(grid[99], 120.0);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_long_call_breakeven() {
        let out = simulator().simulate(Strategy::LongCall, &contract(OptionType::Call), 100.0);
        assert!(!out.is_sentinel());
        let sim = out.value();
        assert_eq!(sim.price_scenarios.len(), 100);
        assert_eq!(sim.pnl.len(), 100);
        assert_eq!(sim.breakeven_points.len(), 1, "breakevens={:?}", sim.breakeven_points);
        assert!((sim.breakeven_points[0] - 105.0).abs() < 1.0);
        assert_eq!(sim.max_loss, -5.0);
        assert_eq!(sim.pnl[0], -5.0);
        // Sampled ceiling: 120 - 100 - 5.
        assert!((sim.max_profit - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_put_breakeven() {
        let sim = simulator()
            .simulate(Strategy::LongPut, &contract(OptionType::Put), 100.0)
            .into_value();
        assert_eq!(sim.breakeven_points.len(), 1);
        assert!((sim.breakeven_points[0] - 95.0).abs() < 1.0);
        assert!((sim.max_profit - 15.0).abs() < 1e-9);
        assert_eq!(sim.max_loss, -5.0);
    }

    #[test]
    fn test_unmodeled_strategy_is_flat_zero() {
        let sim = simulator()
            .simulate(Strategy::IronCondor, &contract(OptionType::Call), 100.0)
            .into_value();
        assert!(sim.pnl.iter().all(|&p| p == 0.0));
        assert!(sim.breakeven_points.is_empty());
        assert_eq!(sim.max_profit, 0.0);
        assert_eq!(sim.max_loss, 0.0);
    }

    #[test]
    fn test_bad_spot_sentinel() {
        let out = simulator().simulate(Strategy::LongCall, &contract(OptionType::Call), 0.0);
        assert!(out.is_sentinel());
        assert!(out.value().price_scenarios.is_empty());
        assert!(out.value().breakeven_points.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let c = contract(OptionType::Call);
        let a = simulator().simulate(Strategy::LongCall, &c, 101.7);
        let b = simulator().simulate(Strategy::LongCall, &c, 101.7);
        assert_eq!(a, b);
    }
}
