use crate::config::PricingConfig;
use crate::errors::{AnalyticsError, EngineResult};
use chrono::NaiveDate;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::str::FromStr;

// ── Option Type ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl FromStr for OptionType {
    type Err = AnalyticsError;

    /// The one hard failure in the core path. Checked before any math runs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(AnalyticsError::InvalidInput(format!(
                "option type must be 'call' or 'put', got '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// Trim, upper-case, and require 1-5 ASCII letters.
pub fn validate_ticker(raw: &str) -> EngineResult<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(AnalyticsError::InvalidInput("ticker cannot be empty".into()));
    }
    if ticker.len() > 5 || !ticker.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AnalyticsError::InvalidInput(format!("invalid ticker format: '{ticker}'")));
    }
    Ok(ticker)
}

// ── Contract ──

/// A single listed option, validated at construction and immutable after.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContractSnapshot {
    strike: f64,
    last_price: f64,
    implied_volatility: f64,
    option_type: OptionType,
    days_to_expiry: u32,
    expiration: NaiveDate,
}

impl ContractSnapshot {
    /// Build from an expiration date. Days to expiry is measured from `as_of`
    /// and floored at zero for already-expired contracts.
    pub fn new(
        strike: f64,
        last_price: f64,
        implied_volatility: f64,
        option_type: OptionType,
        expiration: NaiveDate,
        as_of: NaiveDate,
        pricing: &PricingConfig,
    ) -> EngineResult<Self> {
        let days = (expiration - as_of).num_days().clamp(0, i64::from(u32::MAX));
        Self::validated(
            strike,
            last_price,
            implied_volatility,
            option_type,
            days as u32,
            expiration,
            pricing,
        )
    }

    /// Build from a day count. The expiration is `as_of + days_to_expiry`.
    pub fn from_days(
        strike: f64,
        last_price: f64,
        implied_volatility: f64,
        option_type: OptionType,
        days_to_expiry: u32,
        as_of: NaiveDate,
        pricing: &PricingConfig,
    ) -> EngineResult<Self> {
        let expiration = as_of
            .checked_add_days(chrono::Days::new(u64::from(days_to_expiry)))
            .ok_or_else(|| AnalyticsError::InvalidInput("expiration out of range".into()))?;
        Self::validated(
            strike,
            last_price,
            implied_volatility,
            option_type,
            days_to_expiry,
            expiration,
            pricing,
        )
    }

    fn validated(
        strike: f64,
        last_price: f64,
        implied_volatility: f64,
        option_type: OptionType,
        days_to_expiry: u32,
        expiration: NaiveDate,
        pricing: &PricingConfig,
    ) -> EngineResult<Self> {
        if !strike.is_finite() || strike < pricing.min_strike || strike > pricing.max_strike {
            return Err(AnalyticsError::InvalidInput(format!(
                "strike {strike} outside [{}, {}]",
                pricing.min_strike, pricing.max_strike
            )));
        }
        if !last_price.is_finite() || last_price < 0.0 {
            return Err(AnalyticsError::InvalidInput(format!(
                "last price must be finite and non-negative, got {last_price}"
            )));
        }

        let iv = pricing.sanitize_iv(implied_volatility);
        if iv != implied_volatility {
            tracing::warn!(
                supplied = implied_volatility,
                used = iv,
                "implied volatility out of range, using default"
            );
        }

        Ok(Self {
            strike,
            last_price,
            implied_volatility: iv,
            option_type,
            days_to_expiry,
            expiration,
        })
    }

    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Premium paid for one long contract.
    #[inline]
    pub fn last_price(&self) -> f64 {
        self.last_price
    }

    #[inline]
    pub fn implied_volatility(&self) -> f64 {
        self.implied_volatility
    }

    #[inline]
    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    #[inline]
    pub fn days_to_expiry(&self) -> u32 {
        self.days_to_expiry
    }

    pub fn reference(&self, ticker: &str) -> ContractRef {
        ContractRef {
            ticker: ticker.to_string(),
            strike: self.strike,
            expiration: Some(self.expiration),
            option_type: Some(self.option_type),
        }
    }
}

/// What a recommendation points back at.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContractRef {
    pub ticker: String,
    pub strike: f64,
    pub expiration: Option<NaiveDate>,
    pub option_type: Option<OptionType>,
}

/// Market activity on one contract. Quotes that are missing, negative, or
/// non-finite are dropped to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct ContractQuote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: u64,
    pub open_interest: u64,
}

impl ContractQuote {
    pub fn new(bid: Option<f64>, ask: Option<f64>, volume: u64, open_interest: u64) -> Self {
        let usable = |p: Option<f64>| p.filter(|v| v.is_finite() && *v >= 0.0);
        Self {
            bid: usable(bid),
            ask: usable(ask),
            volume,
            open_interest,
        }
    }

    /// ask - bid, when both sides are quoted and not crossed.
    #[inline]
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) if ask >= bid => Some(ask - bid),
            _ => None,
        }
    }
}

// ── Underlying ──

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum WindowLabel {
    #[serde(rename = "5d")]
    FiveDay,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonth,
    #[serde(rename = "6mo")]
    SixMonth,
    #[serde(rename = "1y")]
    OneYear,
}

impl WindowLabel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "5d" => Some(Self::FiveDay),
            "1mo" => Some(Self::OneMonth),
            "3mo" => Some(Self::ThreeMonth),
            "6mo" => Some(Self::SixMonth),
            "1y" => Some(Self::OneYear),
            _ => None,
        }
    }
}

/// One trailing observation window of the underlying.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceWindow {
    pub start_price: f64,
    pub end_price: f64,
    pub high: f64,
    pub low: f64,
    pub annualized_volatility: f64,
}

impl PriceWindow {
    /// (end - start) / start, or None when start is not a usable price.
    #[inline]
    pub fn momentum(&self) -> Option<f64> {
        if !self.start_price.is_finite() || self.start_price <= 0.0 || !self.end_price.is_finite() {
            return None;
        }
        Some((self.end_price - self.start_price) / self.start_price)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UnderlyingSnapshot {
    current_price: f64,
    windows: BTreeMap<WindowLabel, PriceWindow>,
    expected_move: f64,
}

impl UnderlyingSnapshot {
    pub fn new(
        current_price: f64,
        windows: BTreeMap<WindowLabel, PriceWindow>,
        expected_move: f64,
    ) -> EngineResult<Self> {
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(AnalyticsError::InvalidInput(format!(
                "underlying price must be positive, got {current_price}"
            )));
        }
        if !expected_move.is_finite() || expected_move < 0.0 {
            return Err(AnalyticsError::InvalidInput(format!(
                "expected move must be non-negative, got {expected_move}"
            )));
        }
        Ok(Self {
            current_price,
            windows,
            expected_move,
        })
    }

    #[inline]
    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    #[inline]
    pub fn expected_move(&self) -> f64 {
        self.expected_move
    }

    #[inline]
    pub fn window(&self, label: WindowLabel) -> Option<&PriceWindow> {
        self.windows.get(&label)
    }
}

// ── Computed Records ──

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    /// Per calendar day.
    pub theta: f64,
    /// Per 1 vol point.
    pub vega: f64,
    /// Per 1% rate move.
    pub rho: f64,
}

impl Greeks {
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.delta.is_finite()
            && self.gamma.is_finite()
            && self.theta.is_finite()
            && self.vega.is_finite()
            && self.rho.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct VolatilityMetrics {
    pub historical_volatility: f64,
    pub current_iv: f64,
    /// (IV - HV) / HV. Not bounded.
    pub iv_rank: f64,
    /// Phi(iv_rank) * 100. A squashing of the rank, not a historical percentile.
    pub iv_percentile: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct RiskMetrics {
    /// +inf for a long call.
    #[serde(serialize_with = "serialize_unbounded")]
    pub max_profit: f64,
    pub max_loss: f64,
    pub breakeven: f64,
    pub prob_profit: f64,
    /// +inf when max_profit is unbounded. Compare it, never do arithmetic on it.
    #[serde(serialize_with = "serialize_unbounded")]
    pub risk_adjusted_return: f64,
}

fn serialize_unbounded<S: serde::Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    if v.is_infinite() {
        s.serialize_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        s.serialize_f64(*v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketBias {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for MarketBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    LongCall,
    BullCallSpread,
    DiagonalSpread,
    LongPut,
    BearPutSpread,
    RatioBackspread,
    IronCondor,
    ShortStraddle,
    ShortStrangle,
}

impl Strategy {
    /// Archetypes that fit a bias, most directional first.
    pub fn family(bias: MarketBias) -> &'static [Strategy] {
        match bias {
            MarketBias::Bullish => &[Self::LongCall, Self::BullCallSpread, Self::DiagonalSpread],
            MarketBias::Bearish => &[Self::LongPut, Self::BearPutSpread, Self::RatioBackspread],
            MarketBias::Neutral => &[Self::IronCondor, Self::ShortStraddle, Self::ShortStrangle],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongCall => "long_call",
            Self::BullCallSpread => "bull_call_spread",
            Self::DiagonalSpread => "diagonal_spread",
            Self::LongPut => "long_put",
            Self::BearPutSpread => "bear_put_spread",
            Self::RatioBackspread => "ratio_backspread",
            Self::IronCondor => "iron_condor",
            Self::ShortStraddle => "short_straddle",
            Self::ShortStrangle => "short_strangle",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Recommendation {
    pub market_bias: MarketBias,
    pub strategy: Strategy,
    pub position_size: u32,
    pub risk_metrics: RiskMetrics,
    pub contract: ContractRef,
}

impl Recommendation {
    /// Default record when upstream data is missing: neutral, iron condor,
    /// nothing sized, all-zero risk.
    pub fn unavailable(contract: ContractRef) -> Self {
        Self {
            market_bias: MarketBias::Neutral,
            strategy: Strategy::IronCondor,
            position_size: 0,
            risk_metrics: RiskMetrics::default(),
            contract,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct SimulationResult {
    pub price_scenarios: Vec<f64>,
    pub pnl: Vec<f64>,
    /// Sampled maximum over the grid, always finite.
    pub max_profit: f64,
    pub max_loss: f64,
    pub breakeven_points: SmallVec<[f64; 4]>,
}
