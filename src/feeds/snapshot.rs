use crate::advisor::{AnalysisInput, ChainInput};
use crate::config::PricingConfig;
use crate::errors::{AnalyticsError, EngineResult};
use crate::types::{
    validate_ticker, ContractQuote, ContractSnapshot, OptionType, PriceWindow, UnderlyingSnapshot,
    WindowLabel,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

// Wire format, as stored in `<data_dir>/<TICKER>.json` or posted to the API:
// {
//   "ticker": "SPY",
//   "as_of": "2025-04-01",
//   "option": {
//     "strike": 520.0,
//     "last_price": 8.35,
//     "implied_volatility": 0.21,
//     "option_type": "call",
//     "expiration": "2025-05-02",
//     "bid": 8.30, "ask": 8.40, "volume": 1520, "open_interest": 8210
//   },
//   "underlying": {
//     "current_price": 518.2,
//     "historical_data": {
//       "5d":  { "start_price": 505.0, "end_price": 518.2,
//                "high": 519.0, "low": 503.1, "annualized_volatility": 0.18 },
//       "1mo": { ... }
//     },
//     "expected_move": 0.031
//   },
//   "closes": [505.0, 509.4, 512.8, 515.1, 518.2]
// }

/// Raw option contract fields, before validation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawContract {
    pub strike: f64,
    pub last_price: f64,
    /// Missing or null falls back to the configured default IV.
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    pub option_type: String,
    pub expiration: NaiveDate,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub volume: u64,
    #[serde(default, alias = "openInterest")]
    pub open_interest: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawUnderlying {
    pub current_price: f64,
    /// Keyed by window label. Unknown labels are ignored.
    #[serde(default)]
    pub historical_data: BTreeMap<String, PriceWindow>,
    #[serde(default)]
    pub expected_move: f64,
}

/// One contract plus the market context needed to analyze it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    /// Valuation date. Defaults to today (UTC).
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    pub option: RawContract,
    pub underlying: RawUnderlying,
    /// Daily closes of the underlying, oldest first.
    #[serde(default)]
    pub closes: Vec<f64>,
}

impl MarketSnapshot {
    /// Typed inputs for the pipeline. Option type is checked first so a bad
    /// value never reaches any computation.
    pub fn validate(&self, pricing: &PricingConfig) -> EngineResult<AnalysisInput> {
        let option_type: OptionType = self.option.option_type.parse()?;
        let ticker = validate_ticker(&self.ticker)?;
        let as_of = resolve_as_of(self.as_of);

        let contract = validate_contract(&self.option, option_type, as_of, pricing)?;
        let underlying = validate_underlying(&self.underlying)?;

        Ok(AnalysisInput {
            ticker,
            contract,
            quote: quote_of(&self.option),
            underlying,
            closes: self.closes.clone(),
        })
    }
}

/// An option chain on one underlying, for screening.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChainSnapshot {
    pub ticker: String,
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    pub options: Vec<RawContract>,
    pub underlying: RawUnderlying,
    #[serde(default)]
    pub closes: Vec<f64>,
    /// Daily traded volume of the underlying, oldest first.
    #[serde(default)]
    pub daily_volumes: Vec<f64>,
}

impl ChainSnapshot {
    /// Any invalid contract rejects the whole chain.
    pub fn validate(&self, pricing: &PricingConfig) -> EngineResult<ChainInput> {
        let ticker = validate_ticker(&self.ticker)?;
        let as_of = resolve_as_of(self.as_of);

        let contracts = self
            .options
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let option_type: OptionType =
                    raw.option_type.parse().map_err(|e| tag_index(i, e))?;
                validate_contract(raw, option_type, as_of, pricing).map_err(|e| tag_index(i, e))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(ChainInput {
            ticker,
            contracts,
            quotes: self.options.iter().map(quote_of).collect(),
            underlying: validate_underlying(&self.underlying)?,
            closes: self.closes.clone(),
            daily_volumes: self.daily_volumes.clone(),
        })
    }
}

fn resolve_as_of(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| chrono::Utc::now().date_naive())
}

fn validate_contract(
    raw: &RawContract,
    option_type: OptionType,
    as_of: NaiveDate,
    pricing: &PricingConfig,
) -> EngineResult<ContractSnapshot> {
    // Null IV goes through the same substitution as an out-of-range one.
    let iv = raw.implied_volatility.unwrap_or(f64::NAN);
    ContractSnapshot::new(
        raw.strike,
        raw.last_price,
        iv,
        option_type,
        raw.expiration,
        as_of,
        pricing,
    )
}

fn quote_of(raw: &RawContract) -> ContractQuote {
    ContractQuote::new(raw.bid, raw.ask, raw.volume, raw.open_interest)
}

fn validate_underlying(raw: &RawUnderlying) -> EngineResult<UnderlyingSnapshot> {
    let mut windows = BTreeMap::new();
    for (label, window) in &raw.historical_data {
        match WindowLabel::parse(label) {
            Some(l) => {
                windows.insert(l, *window);
            }
            None => tracing::debug!(label = %label, "ignoring unknown history window"),
        }
    }
    UnderlyingSnapshot::new(raw.current_price, windows, raw.expected_move)
}

fn tag_index(i: usize, e: AnalyticsError) -> AnalyticsError {
    match e {
        AnalyticsError::InvalidInput(msg) => {
            AnalyticsError::InvalidInput(format!("options[{i}]: {msg}"))
        }
        other => other,
    }
}
