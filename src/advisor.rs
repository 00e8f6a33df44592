use crate::config::AnalyticsConfig;
use crate::errors::{AnalyticsError, Computed, EngineResult, ErrorKind};
use crate::models::black_scholes::GreeksCalculator;
use crate::models::volatility::VolatilityAnalyzer;
use crate::risk::metrics::compute_risk_metrics;
use crate::risk::sizing::PositionSizer;
use crate::scenario::simulator::ScenarioSimulator;
use crate::strategy::bias::{analyze_market_conditions, MomentumSignals};
use crate::strategy::selector::StrategySelector;
use crate::strategy::volume::{analyze_volume, VolumeAnalysis};
use crate::types::{
    ContractQuote, ContractRef, ContractSnapshot, Greeks, MarketBias, Recommendation, RiskMetrics,
    SimulationResult, Strategy, UnderlyingSnapshot, VolatilityMetrics,
};
use std::sync::Arc;

/// Validated inputs for one contract analysis.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub ticker: String,
    pub contract: ContractSnapshot,
    pub quote: ContractQuote,
    pub underlying: UnderlyingSnapshot,
    /// Daily closes of the underlying, oldest first.
    pub closes: Vec<f64>,
}

/// Validated option chain. `contracts` and `quotes` are parallel and keep
/// request order.
#[derive(Debug, Clone)]
pub struct ChainInput {
    pub ticker: String,
    pub contracts: Vec<ContractSnapshot>,
    pub quotes: Vec<ContractQuote>,
    pub underlying: UnderlyingSnapshot,
    pub closes: Vec<f64>,
    pub daily_volumes: Vec<f64>,
}

/// Everything one pass of the pipeline produced, sentinels included.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisReport {
    pub request_id: String,
    pub recommendation: Recommendation,
    /// The rest of the bias family, most directional first.
    pub alternatives: Vec<Strategy>,
    /// position_size * max_loss.
    pub capital_at_risk: f64,
    pub greeks: Computed<Greeks>,
    pub theoretical_price: Computed<f64>,
    pub volatility: Computed<VolatilityMetrics>,
    pub momentum: MomentumSignals,
    pub expected_move: f64,
    pub quote: ContractQuote,
    pub risk: Computed<RiskMetrics>,
    pub simulation: Computed<SimulationResult>,
}

impl AnalysisReport {
    /// True when any stage fell back to its sentinel.
    pub fn has_sentinel(&self) -> bool {
        self.greeks.is_sentinel()
            || self.theoretical_price.is_sentinel()
            || self.volatility.is_sentinel()
            || self.risk.is_sentinel()
            || self.simulation.is_sentinel()
    }
}

/// A contract that survived screening, with the numbers it was screened on.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScreenedContract {
    pub index: usize,
    pub contract: ContractRef,
    pub days_to_expiry: u32,
    pub iv_percentile: f64,
    pub quote: ContractQuote,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ScreenReport {
    pub market_bias: MarketBias,
    pub momentum: MomentumSignals,
    pub candidates: usize,
    pub passed: Vec<ScreenedContract>,
    pub volume: VolumeAnalysis,
}

/// The five-stage pipeline. Holds only immutable configuration, so one
/// instance is shared across concurrent requests.
pub struct Advisor {
    config: AnalyticsConfig,
    greeks: GreeksCalculator,
    volatility: VolatilityAnalyzer,
    sizer: PositionSizer,
    selector: StrategySelector,
    simulator: ScenarioSimulator,
}

impl Advisor {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            config: *config,
            greeks: GreeksCalculator::new(&config.pricing),
            volatility: VolatilityAnalyzer::new(&config.volatility),
            sizer: PositionSizer::new(&config.sizing),
            selector: StrategySelector::new(&config.strategy),
            simulator: ScenarioSimulator::new(&config.simulation),
        }
    }

    /// Run greeks -> volatility -> risk -> selection -> simulation in order.
    /// Never fails: each stage degrades to its sentinel independently.
    pub fn analyze(&self, input: &AnalysisInput) -> AnalysisReport {
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "analysis",
            request_id = %request_id,
            ticker = %input.ticker
        );
        let _guard = span.enter();

        let contract = &input.contract;
        let spot = input.underlying.current_price();
        let days = i64::from(contract.days_to_expiry());
        let rate = self.config.pricing.risk_free_rate;

        let greeks = self.greeks.compute_greeks(contract, spot, days, rate);
        let theoretical_price = self.greeks.theoretical_price(contract, spot, days, rate);
        let volatility = self
            .volatility
            .compute_from_prices(&input.closes, contract.implied_volatility());

        let momentum = MomentumSignals::from_underlying(&input.underlying);
        let market_bias = analyze_market_conditions(Some(&input.underlying), &self.config.strategy);

        let risk = compute_risk_metrics(contract, greeks.value());
        let position_size = self.sizer.position_size(risk.value());
        let capital_at_risk = self
            .sizer
            .capital_at_risk(position_size, risk.value().max_loss);
        let strategy = self
            .selector
            .select(market_bias, risk.value(), volatility.value());
        let simulation = self.simulator.simulate(strategy, contract, spot);

        tracing::info!(
            bias = %market_bias,
            strategy = %strategy,
            position_size = position_size,
            capital_at_risk = capital_at_risk,
            "recommendation ready"
        );

        AnalysisReport {
            request_id,
            recommendation: Recommendation {
                market_bias,
                strategy,
                position_size,
                risk_metrics: *risk.value(),
                contract: contract.reference(&input.ticker),
            },
            alternatives: alternatives(market_bias, strategy),
            capital_at_risk,
            greeks,
            theoretical_price,
            volatility,
            momentum,
            expected_move: input.underlying.expected_move(),
            quote: input.quote,
            risk,
            simulation,
        }
    }

    /// Report returned when the provider had nothing for `ticker`.
    pub fn unavailable_report(&self, ticker: &str, reason: AnalyticsError) -> AnalysisReport {
        let detail = reason.to_string();
        let kind = reason.kind();
        tracing::warn!(
            ticker = %ticker,
            reason = %detail,
            "no data, returning default recommendation"
        );

        let recommendation = Recommendation::unavailable(ContractRef {
            ticker: ticker.to_string(),
            strike: 0.0,
            expiration: None,
            option_type: None,
        });
        AnalysisReport {
            request_id: uuid::Uuid::new_v4().to_string(),
            alternatives: alternatives(recommendation.market_bias, recommendation.strategy),
            recommendation,
            capital_at_risk: 0.0,
            greeks: missing(Greeks::default(), kind, &detail),
            theoretical_price: missing(0.0, kind, &detail),
            volatility: missing(VolatilityMetrics::default(), kind, &detail),
            momentum: MomentumSignals::default(),
            expected_move: 0.0,
            quote: ContractQuote::default(),
            risk: missing(RiskMetrics::default(), kind, &detail),
            simulation: missing(SimulationResult::default(), kind, &detail),
        }
    }

    /// Filter an option chain on one underlying down to the contracts worth
    /// analyzing for the current bias, with chain-wide volume alongside.
    pub fn screen(&self, chain: &ChainInput) -> ScreenReport {
        let momentum = MomentumSignals::from_underlying(&chain.underlying);
        let market_bias = analyze_market_conditions(Some(&chain.underlying), &self.config.strategy);

        let passed: Vec<ScreenedContract> = chain
            .contracts
            .iter()
            .zip(&chain.quotes)
            .enumerate()
            .filter_map(|(index, (contract, quote))| {
                let vol = self
                    .volatility
                    .compute_from_prices(&chain.closes, contract.implied_volatility())
                    .into_value();
                self.selector
                    .passes_screen(contract, vol.iv_percentile, market_bias)
                    .then(|| ScreenedContract {
                        index,
                        contract: contract.reference(&chain.ticker),
                        days_to_expiry: contract.days_to_expiry(),
                        iv_percentile: vol.iv_percentile,
                        quote: *quote,
                    })
            })
            .collect();

        let volume = analyze_volume(&chain.contracts, &chain.quotes, &chain.daily_volumes);

        tracing::info!(
            ticker = %chain.ticker,
            bias = %market_bias,
            candidates = chain.contracts.len(),
            passed = passed.len(),
            total_volume = volume.total_volume,
            "chain screened"
        );

        ScreenReport {
            market_bias,
            momentum,
            candidates: chain.contracts.len(),
            passed,
            volume,
        }
    }
}

fn alternatives(bias: MarketBias, chosen: Strategy) -> Vec<Strategy> {
    Strategy::family(bias)
        .iter()
        .copied()
        .filter(|s| *s != chosen)
        .collect()
}

fn missing<T>(value: T, kind: ErrorKind, detail: &str) -> Computed<T> {
    Computed::Sentinel {
        value,
        kind,
        detail: detail.to_string(),
    }
}

/// Analyze independent contracts concurrently, one blocking task each.
/// Output order matches input order.
pub async fn analyze_batch(
    advisor: Arc<Advisor>,
    inputs: Vec<AnalysisInput>,
) -> Vec<EngineResult<AnalysisReport>> {
    let tasks = inputs.into_iter().map(|input| {
        let advisor = Arc::clone(&advisor);
        tokio::task::spawn_blocking(move || advisor.analyze(&input))
    });

    futures_util::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| {
            joined.map_err(|e| AnalyticsError::Unavailable(format!("analysis task failed: {e}")))
        })
        .collect()
}
