use crate::config::VolatilityConfig;
use crate::errors::{AnalyticsError, Computed};
use crate::types::VolatilityMetrics;
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::statistics::Statistics;

/// Trailing realized volatility against current implied volatility.
///
/// hv            = stdev(daily returns) * sqrt(trading_days)
/// iv_rank       = (iv - hv) / hv
/// iv_percentile = Phi(iv_rank) * 100
///
/// The percentile is a monotonic squashing of the rank into [0, 100]. It is
/// not ranked against any history of IV observations.
pub struct VolatilityAnalyzer {
    normal: Normal,
    config: VolatilityConfig,
}

impl VolatilityAnalyzer {
    pub fn new(config: &VolatilityConfig) -> Self {
        Self {
            normal: Normal::standard(),
            config: *config,
        }
    }

    /// Metrics from a series of daily returns. Non-finite entries are dropped.
    ///
    /// Fallbacks:
    /// - no usable returns: all zero, `Unavailable`
    /// - bad `current_iv`: all zero, `InvalidInput`
    /// - fewer than two returns or zero dispersion: hv = 0, rank 0,
    ///   percentile Phi(0) * 100, `ComputationDegenerate`
    pub fn compute_volatility_metrics(
        &self,
        returns: &[f64],
        current_iv: f64,
    ) -> Computed<VolatilityMetrics> {
        if !current_iv.is_finite() || current_iv < 0.0 {
            return Computed::fallback(
                VolatilityMetrics::default(),
                AnalyticsError::InvalidInput(format!(
                    "current IV must be non-negative, got {current_iv}"
                )),
            );
        }

        let usable: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
        if usable.len() < returns.len() {
            tracing::debug!(dropped = returns.len() - usable.len(), "dropped non-finite returns");
        }
        if usable.is_empty() {
            return Computed::fallback(
                VolatilityMetrics::default(),
                AnalyticsError::Unavailable("empty return series".into()),
            );
        }

        // Sample standard deviation; NaN for a single observation.
        let stdev = usable.iter().std_dev();
        let hv = stdev * self.config.trading_days.sqrt();

        if !hv.is_finite() || hv < 1e-12 {
            let flat = VolatilityMetrics {
                historical_volatility: 0.0,
                current_iv,
                iv_rank: 0.0,
                iv_percentile: self.normal.cdf(0.0) * 100.0,
            };
            return Computed::fallback(
                flat,
                AnalyticsError::Degenerate(format!(
                    "historical volatility undefined over {} returns",
                    usable.len()
                )),
            );
        }

        let iv_rank = (current_iv - hv) / hv;
        let metrics = VolatilityMetrics {
            historical_volatility: hv,
            current_iv,
            iv_rank,
            iv_percentile: self.normal.cdf(iv_rank) * 100.0,
        };
        tracing::debug!(
            hv = hv,
            iv = current_iv,
            rank = iv_rank,
            pct = metrics.iv_percentile,
            "volatility metrics"
        );
        Computed::ok(metrics)
    }

    /// Same as `compute_volatility_metrics`, starting from closing prices.
    /// Any non-positive or non-finite close is an `InvalidInput` sentinel.
    pub fn compute_from_prices(
        &self,
        closes: &[f64],
        current_iv: f64,
    ) -> Computed<VolatilityMetrics> {
        match daily_returns(closes) {
            Some(returns) => self.compute_volatility_metrics(&returns, current_iv),
            None => Computed::fallback(
                VolatilityMetrics::default(),
                AnalyticsError::InvalidInput("closing prices must be positive".into()),
            ),
        }
    }
}

/// Simple percent change between consecutive closes.
/// None if any close is not a positive finite price.
pub fn daily_returns(closes: &[f64]) -> Option<Vec<f64>> {
    if closes.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return None;
    }
    Some(closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect())
}
