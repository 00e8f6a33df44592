use crate::config::StrategyConfig;
use crate::types::{MarketBias, UnderlyingSnapshot, WindowLabel};

/// Momentum inputs for bias classification. Stack-allocated, Copy.
/// A `None` field means the window was missing or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct MomentumSignals {
    pub momentum_5d: Option<f64>,
    pub momentum_1mo: Option<f64>,
    /// 1mo annualized vol minus 3mo annualized vol. Informational only.
    pub vol_trend: Option<f64>,
}

impl MomentumSignals {
    pub fn from_underlying(underlying: &UnderlyingSnapshot) -> Self {
        let vol = |label| {
            underlying
                .window(label)
                .map(|w| w.annualized_volatility)
                .filter(|v| v.is_finite())
        };
        Self {
            momentum_5d: underlying.window(WindowLabel::FiveDay).and_then(|w| w.momentum()),
            momentum_1mo: underlying.window(WindowLabel::OneMonth).and_then(|w| w.momentum()),
            vol_trend: match (vol(WindowLabel::OneMonth), vol(WindowLabel::ThreeMonth)) {
                (Some(short), Some(long)) => Some(short - long),
                _ => None,
            },
        }
    }
}

/// Classify the underlying's short-term trend.
///
/// bullish: m5 > +0.02 and m1mo > +0.05
/// bearish: m5 < -0.02 and m1mo < -0.05
/// neutral: everything else, including any missing window.
///
/// Derived per call, never stored. Pure function.
pub fn classify_bias(signals: &MomentumSignals, config: &StrategyConfig) -> MarketBias {
    let (Some(m5), Some(m1mo)) = (signals.momentum_5d, signals.momentum_1mo) else {
        return MarketBias::Neutral;
    };

    if m5 > config.bullish_momentum_5d && m1mo > config.bullish_momentum_1mo {
        MarketBias::Bullish
    } else if m5 < config.bearish_momentum_5d && m1mo < config.bearish_momentum_1mo {
        MarketBias::Bearish
    } else {
        MarketBias::Neutral
    }
}

/// Bias straight from an optional snapshot. No data means neutral.
pub fn analyze_market_conditions(
    underlying: Option<&UnderlyingSnapshot>,
    config: &StrategyConfig,
) -> MarketBias {
    let Some(underlying) = underlying else {
        tracing::warn!("no underlying data, defaulting to neutral bias");
        return MarketBias::Neutral;
    };
    let signals = MomentumSignals::from_underlying(underlying);
    let bias = classify_bias(&signals, config);
    tracing::debug!(
        m5 = ?signals.momentum_5d,
        m1mo = ?signals.momentum_1mo,
        vol_trend = ?signals.vol_trend,
        bias = %bias,
        "market conditions"
    );
    bias
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceWindow;
    use std::collections::BTreeMap;

    fn window(start: f64, end: f64, vol: f64) -> PriceWindow {
        PriceWindow {
            start_price: start,
            end_price: end,
            high: start.max(end),
            low: start.min(end),
            annualized_volatility: vol,
        }
    }

    fn signals(m5: f64, m1mo: f64) -> MomentumSignals {
        MomentumSignals {
            momentum_5d: Some(m5),
            momentum_1mo: Some(m1mo),
            vol_trend: None,
        }
    }

    #[test]
    fn test_bullish_needs_both_windows() {
        let cfg = StrategyConfig::default();
        assert_eq!(classify_bias(&signals(0.03, 0.06), &cfg), MarketBias::Bullish);
        assert_eq!(classify_bias(&signals(0.03, 0.04), &cfg), MarketBias::Neutral);
        assert_eq!(classify_bias(&signals(0.01, 0.06), &cfg), MarketBias::Neutral);
    }

    #[test]
    fn test_bearish() {
        let cfg = StrategyConfig::default();
        assert_eq!(classify_bias(&signals(-0.03, -0.06), &cfg), MarketBias::Bearish);
        // Thresholds are strict.
        assert_eq!(classify_bias(&signals(-0.02, -0.06), &cfg), MarketBias::Neutral);
    }

    #[test]
    fn test_missing_data_is_neutral() {
        let cfg = StrategyConfig::default();
        assert_eq!(classify_bias(&MomentumSignals::default(), &cfg), MarketBias::Neutral);
        assert_eq!(analyze_market_conditions(None, &cfg), MarketBias::Neutral);

        // 1mo window present but 5d missing.
        let mut windows = BTreeMap::new();
        windows.insert(WindowLabel::OneMonth, window(100.0, 110.0, 0.2));
        let u = UnderlyingSnapshot::new(110.0, windows, 0.0).unwrap();
        assert_eq!(analyze_market_conditions(Some(&u), &cfg), MarketBias::Neutral);
    }

    #[test]
    fn test_zero_start_price_is_neutral() {
        let cfg = StrategyConfig::default();
        let mut windows = BTreeMap::new();
        windows.insert(WindowLabel::FiveDay, window(0.0, 110.0, 0.2));
        windows.insert(WindowLabel::OneMonth, window(100.0, 110.0, 0.2));
        let u = UnderlyingSnapshot::new(110.0, windows, 0.0).unwrap();
        assert_eq!(analyze_market_conditions(Some(&u), &cfg), MarketBias::Neutral);
    }

    #[test]
    fn test_signals_from_windows() {
        let mut windows = BTreeMap::new();
        windows.insert(WindowLabel::FiveDay, window(100.0, 104.0, 0.25));
        windows.insert(WindowLabel::OneMonth, window(100.0, 108.0, 0.22));
        windows.insert(WindowLabel::ThreeMonth, window(90.0, 108.0, 0.18));
        let u = UnderlyingSnapshot::new(108.0, windows, 0.03).unwrap();

        let s = MomentumSignals::from_underlying(&u);
        assert!((s.momentum_5d.unwrap() - 0.04).abs() < 1e-12);
        assert!((s.momentum_1mo.unwrap() - 0.08).abs() < 1e-12);
        assert!((s.vol_trend.unwrap() - 0.04).abs() < 1e-12);
        let bias = analyze_market_conditions(Some(&u), &StrategyConfig::default());
        assert_eq!(bias, MarketBias::Bullish);
    }
}
