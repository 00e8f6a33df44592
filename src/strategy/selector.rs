use crate::config::StrategyConfig;
use crate::types::{
    ContractSnapshot, MarketBias, OptionType, RiskMetrics, Strategy, VolatilityMetrics,
};

/// Which number a decision rule compares against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    RiskAdjustedReturn,
    IvPercentile,
}

/// One row of the selection table: when `signal` is strictly above its
/// threshold pick `above`, otherwise `otherwise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionRule {
    pub bias: MarketBias,
    pub signal: Signal,
    pub above: Strategy,
    pub otherwise: Strategy,
}

pub const DECISION_TABLE: [DecisionRule; 3] = [
    DecisionRule {
        bias: MarketBias::Bullish,
        signal: Signal::RiskAdjustedReturn,
        above: Strategy::LongCall,
        otherwise: Strategy::BullCallSpread,
    },
    DecisionRule {
        bias: MarketBias::Bearish,
        signal: Signal::RiskAdjustedReturn,
        above: Strategy::LongPut,
        otherwise: Strategy::BearPutSpread,
    },
    DecisionRule {
        bias: MarketBias::Neutral,
        signal: Signal::IvPercentile,
        above: Strategy::IronCondor,
        otherwise: Strategy::ShortStrangle,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct StrategySelector {
    config: StrategyConfig,
}

impl StrategySelector {
    pub fn new(config: &StrategyConfig) -> Self {
        Self { config: *config }
    }

    #[inline]
    pub fn rule(bias: MarketBias) -> &'static DecisionRule {
        match bias {
            MarketBias::Bullish => &DECISION_TABLE[0],
            MarketBias::Bearish => &DECISION_TABLE[1],
            MarketBias::Neutral => &DECISION_TABLE[2],
        }
    }

    #[inline]
    pub fn threshold(&self, signal: Signal) -> f64 {
        match signal {
            Signal::RiskAdjustedReturn => self.config.directional_rar_cutoff,
            Signal::IvPercentile => self.config.iv_percentile_cutoff,
        }
    }

    /// Pick the archetype for a bias. Pure table lookup.
    ///
    /// An infinite risk-adjusted return (long call) compares above any
    /// threshold. NaN compares below.
    pub fn select(
        &self,
        bias: MarketBias,
        risk: &RiskMetrics,
        vol: &VolatilityMetrics,
    ) -> Strategy {
        let rule = Self::rule(bias);
        let value = match rule.signal {
            Signal::RiskAdjustedReturn => risk.risk_adjusted_return,
            Signal::IvPercentile => vol.iv_percentile,
        };
        if value > self.threshold(rule.signal) {
            rule.above
        } else {
            rule.otherwise
        }
    }

    /// Whether a contract is worth analyzing under `bias`: expiry inside the
    /// screening window, IV percentile inside its band, and for directional
    /// bias the matching option type.
    pub fn passes_screen(
        &self,
        contract: &ContractSnapshot,
        iv_percentile: f64,
        bias: MarketBias,
    ) -> bool {
        let cfg = &self.config;
        let days = contract.days_to_expiry();
        if days < cfg.screen_min_days || days > cfg.screen_max_days {
            return false;
        }
        if !(cfg.screen_min_iv_percentile..=cfg.screen_max_iv_percentile).contains(&iv_percentile) {
            return false;
        }
        match bias {
            MarketBias::Bullish => contract.option_type() == OptionType::Call,
            MarketBias::Bearish => contract.option_type() == OptionType::Put,
            MarketBias::Neutral => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use chrono::NaiveDate;

    fn risk(rar: f64) -> RiskMetrics {
        RiskMetrics { risk_adjusted_return: rar, ..RiskMetrics::default() }
    }

    fn vol(pct: f64) -> VolatilityMetrics {
        VolatilityMetrics { iv_percentile: pct, ..VolatilityMetrics::default() }
    }

    fn contract(option_type: OptionType, days: u32) -> ContractSnapshot {
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let cfg = PricingConfig::default();
        ContractSnapshot::from_days(100.0, 2.5, 0.3, option_type, days, as_of, &cfg).unwrap()
    }

    #[test]
    fn test_table_covers_every_bias_once() {
        for bias in [MarketBias::Bullish, MarketBias::Bearish, MarketBias::Neutral] {
            assert_eq!(DECISION_TABLE.iter().filter(|r| r.bias == bias).count(), 1);
            assert_eq!(StrategySelector::rule(bias).bias, bias);
        }
    }

    #[test]
    fn test_bullish_selection() {
        let sel = StrategySelector::new(&StrategyConfig::default());
        let pick = |rar: f64| sel.select(MarketBias::Bullish, &risk(rar), &vol(50.0));
        assert_eq!(pick(3.0), Strategy::LongCall);
        assert_eq!(pick(1.0), Strategy::BullCallSpread);
        assert_eq!(pick(2.0), Strategy::BullCallSpread);
        assert_eq!(pick(f64::INFINITY), Strategy::LongCall);
    }

    #[test]
    fn test_bearish_selection() {
        let sel = StrategySelector::new(&StrategyConfig::default());
        let pick = |rar: f64| sel.select(MarketBias::Bearish, &risk(rar), &vol(50.0));
        assert_eq!(pick(10.8), Strategy::LongPut);
        assert_eq!(pick(0.5), Strategy::BearPutSpread);
        assert_eq!(pick(f64::NAN), Strategy::BearPutSpread);
    }

    #[test]
    fn test_neutral_uses_iv_percentile() {
        let sel = StrategySelector::new(&StrategyConfig::default());
        let pick = |pct: f64| sel.select(MarketBias::Neutral, &risk(99.0), &vol(pct));
        assert_eq!(pick(85.0), Strategy::IronCondor);
        assert_eq!(pick(70.0), Strategy::ShortStrangle);
        // All-zero sentinels land on the conservative branch.
        assert_eq!(
            sel.select(MarketBias::Neutral, &RiskMetrics::default(), &VolatilityMetrics::default()),
            Strategy::ShortStrangle
        );
    }

    #[test]
    fn test_selected_strategy_belongs_to_family() {
        let sel = StrategySelector::new(&StrategyConfig::default());
        for bias in [MarketBias::Bullish, MarketBias::Bearish, MarketBias::Neutral] {
            for (rar, pct) in [(0.0, 0.0), (5.0, 90.0)] {
                let s = sel.select(bias, &risk(rar), &vol(pct));
                assert!(Strategy::family(bias).contains(&s), "{s} not in {bias} family");
            }
        }
    }

    #[test]
    fn test_screen() {
        let sel = StrategySelector::new(&StrategyConfig::default());
        assert!(sel.passes_screen(&contract(OptionType::Call, 30), 50.0, MarketBias::Bullish));
        assert!(!sel.passes_screen(&contract(OptionType::Put, 30), 50.0, MarketBias::Bullish));
        assert!(sel.passes_screen(&contract(OptionType::Put, 30), 50.0, MarketBias::Neutral));
        assert!(!sel.passes_screen(&contract(OptionType::Call, 3), 50.0, MarketBias::Neutral));
        assert!(!sel.passes_screen(&contract(OptionType::Call, 60), 50.0, MarketBias::Neutral));
        assert!(!sel.passes_screen(&contract(OptionType::Call, 30), 90.0, MarketBias::Neutral));
    }
}
