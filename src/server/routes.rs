use crate::advisor::{analyze_batch, AnalysisInput, AnalysisReport, ScreenReport};
use crate::errors::{AnalyticsError, ErrorKind};
use crate::feeds::snapshot::{ChainSnapshot, MarketSnapshot};
use crate::feeds::SnapshotProvider;
use crate::state::{AppState, CounterSnapshot, PerfCounters};
use crate::types::validate_ticker;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use std::sync::Arc;

/// Largest accepted batch.
pub const MAX_BATCH: usize = 200;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Report(Box<AnalysisReport>),
    Rejected { error: String, kind: ErrorKind },
}

#[derive(Debug, serde::Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
}

fn status_for(err: &AnalyticsError) -> StatusCode {
    match err.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::ComputationDegenerate => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn reject(state: &AppState, err: AnalyticsError) -> ApiError {
    PerfCounters::bump(&state.counters.requests_rejected);
    tracing::warn!(error = %err, "request rejected");
    (
        status_for(&err),
        Json(serde_json::json!({ "error": err.to_string(), "kind": err.kind() })),
    )
}

fn record(state: &AppState, report: &AnalysisReport) {
    PerfCounters::bump(&state.counters.analyses_completed);
    if report.has_sentinel() {
        PerfCounters::bump(&state.counters.sentinel_reports);
    }
}

/// Run one analysis off the async runtime.
async fn run_one(
    state: &Arc<AppState>,
    input: AnalysisInput,
) -> Result<AnalysisReport, ApiError> {
    let advisor = Arc::clone(&state.advisor);
    let report = tokio::task::spawn_blocking(move || advisor.analyze(&input))
        .await
        .map_err(|e| {
            reject(state, AnalyticsError::Unavailable(format!("analysis task failed: {e}")))
        })?;
    record(state, &report);
    Ok(report)
}

/// GET /api/health
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/counters -- request counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<CounterSnapshot> {
    Json(state.counters.snapshot())
}

/// GET /api/analyze/{ticker} -- provider snapshot through the pipeline.
/// No data for the ticker still answers 200 with the default recommendation.
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<AnalysisReport>, ApiError> {
    PerfCounters::bump(&state.counters.requests_received);
    let ticker = validate_ticker(&ticker).map_err(|e| reject(&state, e))?;

    match state.provider.fetch(&ticker).await {
        Ok(snapshot) => {
            let input = snapshot
                .validate(&state.config.analytics.pricing)
                .map_err(|e| reject(&state, e))?;
            run_one(&state, input).await.map(Json)
        }
        Err(e) if e.kind() == ErrorKind::Unavailable => {
            PerfCounters::bump(&state.counters.unavailable_reports);
            Ok(Json(state.advisor.unavailable_report(&ticker, e)))
        }
        Err(e) => Err(reject(&state, e)),
    }
}

/// POST /api/analyze -- analyze a snapshot supplied in the body.
pub async fn post_analysis(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<MarketSnapshot>,
) -> Result<Json<AnalysisReport>, ApiError> {
    PerfCounters::bump(&state.counters.requests_received);
    let input = snapshot
        .validate(&state.config.analytics.pricing)
        .map_err(|e| reject(&state, e))?;
    run_one(&state, input).await.map(Json)
}

/// POST /api/analyze/batch -- independent snapshots analyzed concurrently.
/// Invalid entries are reported in place; the rest still run.
pub async fn post_batch(
    State(state): State<Arc<AppState>>,
    Json(snapshots): Json<Vec<MarketSnapshot>>,
) -> Result<Json<BatchResponse>, ApiError> {
    PerfCounters::bump(&state.counters.requests_received);
    if snapshots.len() > MAX_BATCH {
        return Err(reject(
            &state,
            AnalyticsError::InvalidInput(format!(
                "batch of {} exceeds limit {MAX_BATCH}",
                snapshots.len()
            )),
        ));
    }

    let pricing = state.config.analytics.pricing;
    let mut items: Vec<Option<BatchItem>> = Vec::with_capacity(snapshots.len());
    let mut slots = Vec::new();
    let mut inputs = Vec::new();
    for (i, snapshot) in snapshots.iter().enumerate() {
        match snapshot.validate(&pricing) {
            Ok(input) => {
                slots.push(i);
                inputs.push(input);
                items.push(None);
            }
            Err(e) => items.push(Some(BatchItem::Rejected {
                error: e.to_string(),
                kind: e.kind(),
            })),
        }
    }

    let reports = analyze_batch(Arc::clone(&state.advisor), inputs).await;
    for (slot, result) in slots.into_iter().zip(reports) {
        items[slot] = Some(match result {
            Ok(report) => {
                record(&state, &report);
                BatchItem::Report(Box::new(report))
            }
            Err(e) => BatchItem::Rejected {
                error: e.to_string(),
                kind: e.kind(),
            },
        });
    }

    tracing::info!(size = items.len(), "batch analyzed");
    Ok(Json(BatchResponse {
        results: items.into_iter().flatten().collect(),
    }))
}

/// POST /api/screen -- filter an option chain for the current bias, with
/// volume and open interest across the chain.
pub async fn post_screen(
    State(state): State<Arc<AppState>>,
    Json(chain): Json<ChainSnapshot>,
) -> Result<Json<ScreenReport>, ApiError> {
    PerfCounters::bump(&state.counters.requests_received);
    let input = chain
        .validate(&state.config.analytics.pricing)
        .map_err(|e| reject(&state, e))?;

    let advisor = Arc::clone(&state.advisor);
    let report = tokio::task::spawn_blocking(move || advisor.screen(&input))
        .await
        .map_err(|e| {
            reject(&state, AnalyticsError::Unavailable(format!("screen task failed: {e}")))
        })?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyticsConfig, AppConfig, RetryConfig};
    use crate::types::{MarketBias, Strategy};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn app_with_retry(dir: &std::path::Path, retry: RetryConfig) -> Arc<AppState> {
        AppState::new(AppConfig {
            analytics: AnalyticsConfig::default(),
            retry,
            data_dir: dir.to_path_buf(),
            cache_ttl: Duration::from_secs(60),
            server_port: 0,
        })
    }

    fn app(dir: &std::path::Path) -> Arc<AppState> {
        app_with_retry(
            dir,
            RetryConfig {
                max_attempts: 1,
                base_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(1),
            },
        )
    }

    const UNDERLYING: &str = r#"{
        "current_price": 100.0,
        "historical_data": {
            "5d":  { "start_price": 97.0, "end_price": 100.0, "high": 100.2,
                     "low": 96.8, "annualized_volatility": 0.2 },
            "1mo": { "start_price": 94.0, "end_price": 100.0, "high": 100.2,
                     "low": 93.5, "annualized_volatility": 0.2 }
        },
        "expected_move": 0.02
    }"#;

    const CLOSES: &str = "[100.0, 101.0, 99.5, 100.5, 102.0, 101.0, 100.0, 100.8]";

    fn option_json(option_type: &str, volume: u64, open_interest: u64) -> String {
        format!(
            r#"{{ "strike": 100.0, "last_price": 5.0, "implied_volatility": 0.3,
                 "option_type": "{option_type}", "expiration": "2025-05-01",
                 "bid": 4.9, "ask": 5.1, "volume": {volume}, "openInterest": {open_interest} }}"#
        )
    }

    fn snapshot_json(ticker: &str, option_type: &str) -> String {
        format!(
            r#"{{
                "ticker": "{ticker}",
                "as_of": "2025-04-01",
                "option": {option},
                "underlying": {UNDERLYING},
                "closes": {CLOSES}
            }}"#,
            option = option_json(option_type, 1_500, 4_000),
        )
    }

    fn snapshot(ticker: &str, option_type: &str) -> MarketSnapshot {
        serde_json::from_str(&snapshot_json(ticker, option_type)).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_from_provider() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("SPY.json"), snapshot_json("SPY", "call")).unwrap();
        let state = app(dir.path());

        let Json(report) = get_analysis(State(Arc::clone(&state)), Path("spy".into()))
            .await
            .unwrap();
        assert_eq!(report.recommendation.market_bias, MarketBias::Bullish);
        assert_eq!(report.recommendation.strategy, Strategy::LongCall);
        assert_eq!(report.recommendation.contract.ticker, "SPY");
        assert_eq!(report.quote.open_interest, 4_000);
        assert_eq!(state.counters.snapshot().analyses_completed, 1);
    }

    #[tokio::test]
    async fn test_missing_ticker_returns_default_report() {
        let dir = tempdir().unwrap();
        let state = app(dir.path());
        let Json(report) = get_analysis(State(Arc::clone(&state)), Path("IWM".into()))
            .await
            .unwrap();
        assert_eq!(report.recommendation.position_size, 0);
        assert_eq!(report.recommendation.strategy, Strategy::IronCondor);
        assert_eq!(report.greeks.kind(), Some(ErrorKind::Unavailable));
        assert_eq!(state.counters.snapshot().unavailable_reports, 1);
    }

    #[tokio::test]
    async fn test_missing_ticker_answers_without_backoff() {
        // Default retry backs off 200ms then 400ms on transient errors.
        let dir = tempdir().unwrap();
        let state = app_with_retry(dir.path(), RetryConfig::default());

        for _ in 0..2 {
            let started = Instant::now();
            let Json(report) = get_analysis(State(Arc::clone(&state)), Path("DIA".into()))
                .await
                .unwrap();
            assert!(
                started.elapsed() < Duration::from_millis(100),
                "took {:?}",
                started.elapsed()
            );
            assert_eq!(report.recommendation.position_size, 0);
        }
        assert_eq!(state.counters.snapshot().unavailable_reports, 2);
    }

    #[tokio::test]
    async fn test_bad_ticker_is_400() {
        let dir = tempdir().unwrap();
        let state = app(dir.path());
        let err = get_analysis(State(Arc::clone(&state)), Path("BRK.B".into()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(state.counters.snapshot().requests_rejected, 1);
    }

    #[tokio::test]
    async fn test_post_bad_option_type_is_400() {
        let dir = tempdir().unwrap();
        let state = app(dir.path());
        let err = post_analysis(State(state), Json(snapshot("SPY", "straddle")))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1 .0["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_reports_bad_entries() {
        let dir = tempdir().unwrap();
        let state = app(dir.path());
        let body = vec![
            snapshot("SPY", "call"),
            snapshot("QQQ", "butterfly"),
            snapshot("IWM", "put"),
        ];
        let Json(resp) = post_batch(State(Arc::clone(&state)), Json(body)).await.unwrap();
        assert_eq!(resp.results.len(), 3);
        assert!(matches!(
            &resp.results[0],
            BatchItem::Report(r) if r.recommendation.contract.ticker == "SPY"
        ));
        assert!(matches!(
            &resp.results[1],
            BatchItem::Rejected { kind: ErrorKind::InvalidInput, .. }
        ));
        assert!(matches!(
            &resp.results[2],
            BatchItem::Report(r) if r.recommendation.contract.ticker == "IWM"
        ));
        assert_eq!(state.counters.snapshot().analyses_completed, 2);
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let dir = tempdir().unwrap();
        let state = app(dir.path());
        let body = vec![snapshot("SPY", "call"); MAX_BATCH + 1];
        let err = post_batch(State(state), Json(body)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_screen_reports_chain_volume() {
        let dir = tempdir().unwrap();
        let state = app(dir.path());
        let json = format!(
            r#"{{
                "ticker": "SPY",
                "as_of": "2025-04-01",
                "options": [{call}, {put}],
                "underlying": {UNDERLYING},
                "closes": {CLOSES},
                "daily_volumes": [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0]
            }}"#,
            call = option_json("call", 300, 1_000),
            put = option_json("put", 200, 500),
        );
        let chain: ChainSnapshot = serde_json::from_str(&json).unwrap();

        let Json(report) = post_screen(State(state), Json(chain)).await.unwrap();
        assert_eq!(report.candidates, 2);
        assert_eq!(report.volume.total_volume, 500);
        assert_eq!(report.volume.total_open_interest, 1_500);
        assert_eq!(report.volume.by_strike.len(), 1);
        assert_eq!(report.volume.avg_daily_volume, Some(1.5));
        assert!((report.volume.volume_trend.unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }
}
