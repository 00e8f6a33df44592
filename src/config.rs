use crate::errors::{AnalyticsError, EngineResult};
use std::path::PathBuf;
use std::time::Duration;

/// Black-Scholes inputs and the clamps applied to raw contract fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingConfig {
    /// Annual risk-free rate. Default 0.05.
    pub risk_free_rate: f64,
    /// Lowest accepted implied volatility. Default 0.05.
    pub min_iv: f64,
    /// Highest accepted implied volatility. Default 5.0.
    pub max_iv: f64,
    /// Substituted when a supplied IV is non-finite or out of range. Default 0.30.
    pub default_iv: f64,
    /// Default 0.1.
    pub min_strike: f64,
    /// Default 1_000_000.
    pub max_strike: f64,
    /// Upper clamp on days to expiry. Default 1095 (three years).
    pub max_days: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            min_iv: 0.05,
            max_iv: 5.0,
            default_iv: 0.30,
            min_strike: 0.1,
            max_strike: 1_000_000.0,
            max_days: 1095,
        }
    }
}

impl PricingConfig {
    /// IV to feed the model: the supplied value when finite and inside
    /// `[min_iv, max_iv]`, otherwise `default_iv`.
    #[inline]
    pub fn sanitize_iv(&self, iv: f64) -> f64 {
        if iv.is_finite() && iv >= self.min_iv && iv <= self.max_iv {
            iv
        } else {
            self.default_iv
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityConfig {
    /// Annualization constant for daily returns. Default 252.
    pub trading_days: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self { trading_days: 252.0 }
    }
}

/// Fixed-fractional position sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingConfig {
    /// Account equity in dollars. Default 100_000.
    pub account_size: f64,
    /// Share of the account risked per trade. Default 0.02.
    pub max_risk_fraction: f64,
    /// Contract ceiling. Default 100.
    pub position_cap: u32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            account_size: 100_000.0,
            max_risk_fraction: 0.02,
            position_cap: 100,
        }
    }
}

/// Momentum thresholds for bias classification, selection cutoffs for the
/// decision table, and the contract screening window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyConfig {
    /// 5-day momentum above this is bullish. Default 0.02.
    pub bullish_momentum_5d: f64,
    /// 1-month momentum above this is bullish. Default 0.05.
    pub bullish_momentum_1mo: f64,
    /// 5-day momentum below this is bearish. Default -0.02.
    pub bearish_momentum_5d: f64,
    /// 1-month momentum below this is bearish. Default -0.05.
    pub bearish_momentum_1mo: f64,
    /// Risk-adjusted return above which directional bias buys the outright
    /// option instead of a spread. Default 2.0.
    pub directional_rar_cutoff: f64,
    /// IV percentile above which neutral bias picks an iron condor. Default 70.0.
    pub iv_percentile_cutoff: f64,
    /// Default 7.
    pub screen_min_days: u32,
    /// Default 45.
    pub screen_max_days: u32,
    /// Default 20.0.
    pub screen_min_iv_percentile: f64,
    /// Default 80.0.
    pub screen_max_iv_percentile: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            bullish_momentum_5d: 0.02,
            bullish_momentum_1mo: 0.05,
            bearish_momentum_5d: -0.02,
            bearish_momentum_1mo: -0.05,
            directional_rar_cutoff: 2.0,
            iv_percentile_cutoff: 70.0,
            screen_min_days: 7,
            screen_max_days: 45,
            screen_min_iv_percentile: 20.0,
            screen_max_iv_percentile: 80.0,
        }
    }
}

/// Price grid for payoff simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    /// Default 100.
    pub scenario_count: usize,
    /// Lowest scenario as a multiple of spot. Default 0.8.
    pub low_multiple: f64,
    /// Highest scenario as a multiple of spot. Default 1.2.
    pub high_multiple: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scenario_count: 100,
            low_multiple: 0.8,
            high_multiple: 1.2,
        }
    }
}

/// Everything the pure core needs. Built once at startup and shared by reference.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnalyticsConfig {
    pub pricing: PricingConfig,
    pub volatility: VolatilityConfig,
    pub sizing: SizingConfig,
    pub strategy: StrategyConfig,
    pub simulation: SimulationConfig,
}

impl AnalyticsConfig {
    /// Cross-field checks that single-value parsing cannot catch.
    pub fn validate(&self) -> EngineResult<()> {
        let p = &self.pricing;
        if !(p.min_iv > 0.0 && p.min_iv <= p.max_iv) {
            return Err(AnalyticsError::Config(format!(
                "MIN_IV/MAX_IV: invalid range [{}, {}]",
                p.min_iv, p.max_iv
            )));
        }
        if !(p.default_iv >= p.min_iv && p.default_iv <= p.max_iv) {
            return Err(AnalyticsError::Config(format!(
                "DEFAULT_IV: {} outside [{}, {}]",
                p.default_iv, p.min_iv, p.max_iv
            )));
        }

        let sim = &self.simulation;
        if sim.scenario_count < 2 {
            return Err(AnalyticsError::Config("SCENARIO_COUNT: need at least 2".into()));
        }
        if !(sim.low_multiple > 0.0 && sim.low_multiple < sim.high_multiple) {
            return Err(AnalyticsError::Config(format!(
                "SCENARIO_LOW_MULTIPLE/SCENARIO_HIGH_MULTIPLE: need 0 < {} < {}",
                sim.low_multiple, sim.high_multiple
            )));
        }
        Ok(())
    }
}

/// Backoff for snapshot provider calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(5_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub analytics: AnalyticsConfig,
    pub retry: RetryConfig,
    pub data_dir: PathBuf,
    pub cache_ttl: Duration,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let d = AnalyticsConfig::default();

        let pricing = PricingConfig {
            risk_free_rate: parse_or("RISK_FREE_RATE", d.pricing.risk_free_rate)?,
            min_iv: parse_or("MIN_IV", d.pricing.min_iv)?,
            max_iv: parse_or("MAX_IV", d.pricing.max_iv)?,
            default_iv: parse_or("DEFAULT_IV", d.pricing.default_iv)?,
            min_strike: parse_or("MIN_STRIKE", d.pricing.min_strike)?,
            max_strike: parse_or("MAX_STRIKE", d.pricing.max_strike)?,
            max_days: parse_or("MAX_DAYS_TO_EXPIRY", d.pricing.max_days)?,
        };
        let volatility = VolatilityConfig {
            trading_days: parse_or("TRADING_DAYS", d.volatility.trading_days)?,
        };

        let sizing = SizingConfig {
            account_size: parse_or("ACCOUNT_SIZE", d.sizing.account_size)?,
            max_risk_fraction: parse_or("MAX_RISK_FRACTION", d.sizing.max_risk_fraction)?,
            position_cap: parse_or("POSITION_CAP", d.sizing.position_cap)?,
        };

        let s = d.strategy;
        let strategy = StrategyConfig {
            bullish_momentum_5d: parse_or("BULLISH_MOMENTUM_5D", s.bullish_momentum_5d)?,
            bullish_momentum_1mo: parse_or("BULLISH_MOMENTUM_1MO", s.bullish_momentum_1mo)?,
            bearish_momentum_5d: parse_or("BEARISH_MOMENTUM_5D", s.bearish_momentum_5d)?,
            bearish_momentum_1mo: parse_or("BEARISH_MOMENTUM_1MO", s.bearish_momentum_1mo)?,
            directional_rar_cutoff: parse_or("DIRECTIONAL_RAR_CUTOFF", s.directional_rar_cutoff)?,
            iv_percentile_cutoff: parse_or("IV_PERCENTILE_CUTOFF", s.iv_percentile_cutoff)?,
            screen_min_days: parse_or("SCREEN_MIN_DAYS", s.screen_min_days)?,
            screen_max_days: parse_or("SCREEN_MAX_DAYS", s.screen_max_days)?,
            screen_min_iv_percentile: parse_or(
                "SCREEN_MIN_IV_PERCENTILE",
                s.screen_min_iv_percentile,
            )?,
            screen_max_iv_percentile: parse_or(
                "SCREEN_MAX_IV_PERCENTILE",
                s.screen_max_iv_percentile,
            )?,
        };

        let simulation = SimulationConfig {
            scenario_count: parse_or("SCENARIO_COUNT", d.simulation.scenario_count)?,
            low_multiple: parse_or("SCENARIO_LOW_MULTIPLE", d.simulation.low_multiple)?,
            high_multiple: parse_or("SCENARIO_HIGH_MULTIPLE", d.simulation.high_multiple)?,
        };
        let analytics = AnalyticsConfig {
            pricing,
            volatility,
            sizing,
            strategy,
            simulation,
        };
        analytics.validate()?;

        let r = RetryConfig::default();
        let retry = RetryConfig {
            max_attempts: parse_or("RETRY_MAX_ATTEMPTS", r.max_attempts)?.max(1),
            base_backoff: Duration::from_millis(parse_or("RETRY_BASE_MS", 200_u64)?),
            max_backoff: Duration::from_millis(parse_or("RETRY_MAX_MS", 5_000_u64)?),
        };

        Ok(Self {
            analytics,
            retry,
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 300_u64)?),
            server_port: parse_or("SERVER_PORT", 3001_u16)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> EngineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AnalyticsError::Config(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_defaults() {
        let cfg = AnalyticsConfig::default();
        assert_eq!(cfg.pricing.risk_free_rate, 0.05);
        assert_eq!(cfg.pricing.min_iv, 0.05);
        assert_eq!(cfg.pricing.max_iv, 5.0);
        assert_eq!(cfg.pricing.default_iv, 0.30);
        assert_eq!(cfg.sizing.position_cap, 100);
        assert_eq!(cfg.strategy.iv_percentile_cutoff, 70.0);
        assert_eq!(cfg.simulation.scenario_count, 100);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_iv_outside_clamp_rejected() {
        let mut cfg = AnalyticsConfig::default();
        cfg.pricing.default_iv = 7.0;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(ref m) if m.starts_with("DEFAULT_IV")));

        cfg.pricing.default_iv = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_scenario_multiples_must_ascend() {
        let mut cfg = AnalyticsConfig::default();
        cfg.simulation.low_multiple = 1.2;
        cfg.simulation.high_multiple = 0.8;
        assert!(matches!(cfg.validate(), Err(AnalyticsError::Config(_))));

        cfg.simulation.low_multiple = 1.0;
        cfg.simulation.high_multiple = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_iv_range_rejected() {
        let mut cfg = AnalyticsConfig::default();
        cfg.pricing.min_iv = 2.0;
        cfg.pricing.max_iv = 1.0;
        assert!(matches!(cfg.validate(), Err(AnalyticsError::Config(_))));
    }

    #[test]
    fn test_parse_or_falls_back_when_unset() {
        let v: f64 = parse_or("OPTIONS_ADVISOR_TEST_UNSET_KEY", 1.5).unwrap();
        assert_eq!(v, 1.5);
    }
}
