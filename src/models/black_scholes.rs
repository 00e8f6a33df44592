use crate::config::PricingConfig;
use crate::errors::{AnalyticsError, Computed, EngineResult};
use crate::models::{ModelParams, CALENDAR_DAYS};
use crate::types::{ContractSnapshot, Greeks, OptionType};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// European Black-Scholes sensitivities for a single contract.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*t) / (sigma * sqrt(t))
/// d2 = d1 - sigma * sqrt(t)
///
/// Theta is per calendar day, vega per vol point, rho per 1% rate move.
/// Any failure yields all-zero Greeks as a sentinel, never an error.
pub struct GreeksCalculator {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
    config: PricingConfig,
}

impl GreeksCalculator {
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            normal: Normal::standard(),
            config: *config,
        }
    }

    /// Greeks for `contract` at `underlying_price`.
    ///
    /// `days_to_expiry` is clamped to `[0, max_days]` and floored to one day so
    /// that t never reaches zero. Pure function.
    pub fn compute_greeks(
        &self,
        contract: &ContractSnapshot,
        underlying_price: f64,
        days_to_expiry: i64,
        risk_free_rate: f64,
    ) -> Computed<Greeks> {
        match self.try_greeks(contract, underlying_price, days_to_expiry, risk_free_rate) {
            Ok(greeks) => {
                tracing::debug!(
                    delta = greeks.delta,
                    gamma = greeks.gamma,
                    theta = greeks.theta,
                    vega = greeks.vega,
                    rho = greeks.rho,
                    "greeks computed"
                );
                Computed::ok(greeks)
            }
            Err(e) => Computed::fallback(Greeks::default(), e),
        }
    }

    /// Black-Scholes value under the same inputs and clamps as `compute_greeks`.
    pub fn theoretical_price(
        &self,
        contract: &ContractSnapshot,
        underlying_price: f64,
        days_to_expiry: i64,
        risk_free_rate: f64,
    ) -> Computed<f64> {
        let price = self
            .params(contract, underlying_price, days_to_expiry, risk_free_rate)
            .and_then(|p| {
                let n = &self.normal;
                let v = match contract.option_type() {
                    OptionType::Call => p.spot * n.cdf(p.d1) - p.strike * p.discount * n.cdf(p.d2),
                    OptionType::Put => p.strike * p.discount * n.cdf(-p.d2) - p.spot * n.cdf(-p.d1),
                };
                finite(v.max(0.0), "theoretical price")
            });
        match price {
            Ok(v) => Computed::ok(v),
            Err(e) => Computed::fallback(0.0, e),
        }
    }

    fn try_greeks(
        &self,
        contract: &ContractSnapshot,
        underlying_price: f64,
        days_to_expiry: i64,
        risk_free_rate: f64,
    ) -> EngineResult<Greeks> {
        let p = self.params(contract, underlying_price, days_to_expiry, risk_free_rate)?;
        let n = &self.normal;
        let pdf_d1 = n.pdf(p.d1);

        // Shared decay term: -S * phi(d1) * sigma / (2 * sqrt(t))
        let decay = -p.spot * pdf_d1 * p.sigma / (2.0 * p.sqrt_t);
        let carry = p.rate * p.strike * p.discount;

        let (delta, theta_year, rho) = match contract.option_type() {
            OptionType::Call => (
                n.cdf(p.d1),
                decay - carry * n.cdf(p.d2),
                p.strike * p.t_years * p.discount * n.cdf(p.d2) / 100.0,
            ),
            OptionType::Put => (
                n.cdf(p.d1) - 1.0,
                decay + carry * n.cdf(-p.d2),
                -p.strike * p.t_years * p.discount * n.cdf(-p.d2) / 100.0,
            ),
        };

        let greeks = Greeks {
            delta,
            gamma: pdf_d1 / (p.spot * p.sigma_sqrt_t),
            theta: theta_year / CALENDAR_DAYS,
            vega: p.spot * p.sqrt_t * pdf_d1 / 100.0,
            rho,
        };

        if !greeks.is_finite() {
            return Err(AnalyticsError::Degenerate(format!(
                "non-finite greeks for S={} K={}",
                p.spot, p.strike
            )));
        }
        Ok(greeks)
    }

    fn params(
        &self,
        contract: &ContractSnapshot,
        underlying_price: f64,
        days_to_expiry: i64,
        risk_free_rate: f64,
    ) -> EngineResult<ModelParams> {
        if !underlying_price.is_finite() || underlying_price <= 0.0 {
            return Err(AnalyticsError::InvalidInput(format!(
                "underlying price must be positive, got {underlying_price}"
            )));
        }
        if !risk_free_rate.is_finite() {
            return Err(AnalyticsError::InvalidInput("risk-free rate is not finite".into()));
        }
        let strike = contract.strike();
        if strike <= 0.0 {
            return Err(AnalyticsError::InvalidInput(format!(
                "strike must be positive, got {strike}"
            )));
        }

        let sigma = self.config.sanitize_iv(contract.implied_volatility());
        let days = days_to_expiry.clamp(0, self.config.max_days.max(1)).max(1);
        let t_years = days as f64 / CALENDAR_DAYS;

        Ok(ModelParams::new(underlying_price, strike, t_years, sigma, risk_free_rate))
    }
}

#[inline]
fn finite(v: f64, what: &str) -> EngineResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(AnalyticsError::Degenerate(format!("{what} is not finite")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn contract(strike: f64, iv: f64, option_type: OptionType, days: u32) -> ContractSnapshot {
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let cfg = PricingConfig::default();
        ContractSnapshot::from_days(strike, 5.0, iv, option_type, days, as_of, &cfg).unwrap()
    }

    #[test]
    fn test_atm_one_year_reference_values() {
        let calc = GreeksCalculator::new(&PricingConfig::default());
        let c = contract(100.0, 0.2, OptionType::Call, 365);
        let g = calc.compute_greeks(&c, 100.0, 365, 0.05).into_value();
        assert!((g.delta - 0.6368).abs() < 1e-3, "ATM call delta={} should be ~0.637", g.delta);
        assert!((g.gamma - 0.01876).abs() < 1e-4, "gamma={}", g.gamma);
        assert!((g.vega - 0.3752).abs() < 1e-3, "vega={}", g.vega);
        assert!(g.theta < 0.0, "long call theta should decay: {}", g.theta);
        assert!(g.rho > 0.0);

        let price = calc.theoretical_price(&c, 100.0, 365, 0.05).into_value();
        assert!((price - 10.4506).abs() < 1e-3, "ATM call price={price} should be ~10.45");
    }

    #[test]
    fn test_delta_bounds_across_grid() {
        let calc = GreeksCalculator::new(&PricingConfig::default());
        for &iv in &[0.05, 0.2, 0.8, 2.0, 5.0] {
            for &days in &[1_u32, 7, 30, 180, 720] {
                for &spot in &[50.0, 95.0, 100.0, 105.0, 200.0] {
                    let call_contract = contract(100.0, iv, OptionType::Call, days);
                    let put_contract = contract(100.0, iv, OptionType::Put, days);
                    let call = calc.compute_greeks(&call_contract, spot, i64::from(days), 0.05);
                    let put = calc.compute_greeks(&put_contract, spot, i64::from(days), 0.05);
                    let (c, p) = (call.value(), put.value());
                    assert!(
                        (0.0..=1.0).contains(&c.delta),
                        "call delta={} iv={iv} days={days}",
                        c.delta
                    );
                    assert!(
                        (-1.0..=0.0).contains(&p.delta),
                        "put delta={} iv={iv} days={days}",
                        p.delta
                    );
                    assert!(c.gamma >= 0.0 && p.gamma >= 0.0);
                    assert!(c.vega >= 0.0 && p.vega >= 0.0);
                    assert!((c.delta - p.delta - 1.0).abs() < 1e-9, "call-put delta gap must be 1");
                }
            }
        }
    }

    #[test]
    fn test_expiry_floor_keeps_values_finite() {
        let calc = GreeksCalculator::new(&PricingConfig::default());
        for days in [-10_i64, 0, 1] {
            let c = contract(100.0, 0.3, OptionType::Call, 0);
            let out = calc.compute_greeks(&c, 100.0, days, 0.05);
            assert!(!out.is_sentinel(), "days={days} should not fall back");
            let g = out.value();
            assert!(g.theta.is_finite() && g.delta.is_finite(), "days={days} greeks={g:?}");
        }
        // Negative and zero days both collapse onto the one-day floor.
        let c = contract(100.0, 0.3, OptionType::Put, 0);
        assert_eq!(
            calc.compute_greeks(&c, 100.0, -5, 0.05),
            calc.compute_greeks(&c, 100.0, 1, 0.05)
        );
    }

    #[test]
    fn test_bad_spot_returns_zero_sentinel() {
        let calc = GreeksCalculator::new(&PricingConfig::default());
        let c = contract(100.0, 0.3, OptionType::Call, 30);
        for spot in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let out = calc.compute_greeks(&c, spot, 30, 0.05);
            assert!(out.is_sentinel(), "spot={spot} should fall back");
            assert_eq!(*out.value(), Greeks::default());
        }
    }

    #[test]
    fn test_idempotent() {
        let calc = GreeksCalculator::new(&PricingConfig::default());
        let c = contract(420.0, 0.37, OptionType::Put, 12);
        let a = calc.compute_greeks(&c, 411.3, 12, 0.045).into_value();
        let b = calc.compute_greeks(&c, 411.3, 12, 0.045).into_value();
        assert_eq!(a.delta.to_bits(), b.delta.to_bits());
        assert_eq!(a.theta.to_bits(), b.theta.to_bits());
        assert_eq!(a.rho.to_bits(), b.rho.to_bits());
    }
}
