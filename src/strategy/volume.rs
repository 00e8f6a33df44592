//! Volume and open interest across an option chain.
//!
//! avg_daily_volume = mean(daily underlying volume)
//! volume_trend     = mean(last 5 days) / avg_daily_volume - 1
//!
//! Contracts sharing a strike (a call and a put) are merged into one row.

use crate::types::{ContractQuote, ContractSnapshot};
use statrs::statistics::Statistics;

/// Days in the recent window compared against the full average.
pub const TREND_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct StrikeActivity {
    pub strike: f64,
    pub volume: u64,
    pub open_interest: u64,
}

#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct VolumeAnalysis {
    pub total_volume: u64,
    pub total_open_interest: u64,
    /// Ascending strike.
    pub by_strike: Vec<StrikeActivity>,
    /// None without any usable daily volume.
    pub avg_daily_volume: Option<f64>,
    /// None with fewer than `TREND_WINDOW + 1` days or a zero average.
    pub volume_trend: Option<f64>,
}

impl VolumeAnalysis {
    /// Strike carrying the most open interest.
    pub fn max_open_interest_strike(&self) -> Option<f64> {
        self.by_strike
            .iter()
            .max_by_key(|row| row.open_interest)
            .map(|row| row.strike)
    }
}

/// Pure function. `contracts` and `quotes` are parallel; extra entries on
/// either side are ignored.
pub fn analyze_volume(
    contracts: &[ContractSnapshot],
    quotes: &[ContractQuote],
    daily_volumes: &[f64],
) -> VolumeAnalysis {
    let mut rows: Vec<StrikeActivity> = contracts
        .iter()
        .zip(quotes)
        .map(|(contract, quote)| StrikeActivity {
            strike: contract.strike(),
            volume: quote.volume,
            open_interest: quote.open_interest,
        })
        .collect();
    rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));

    let mut by_strike: Vec<StrikeActivity> = Vec::with_capacity(rows.len());
    for row in rows {
        match by_strike.last_mut() {
            Some(last) if last.strike == row.strike => {
                last.volume = last.volume.saturating_add(row.volume);
                last.open_interest = last.open_interest.saturating_add(row.open_interest);
            }
            _ => by_strike.push(row),
        }
    }

    let total_volume = by_strike
        .iter()
        .fold(0_u64, |acc, row| acc.saturating_add(row.volume));
    let total_open_interest = by_strike
        .iter()
        .fold(0_u64, |acc, row| acc.saturating_add(row.open_interest));

    let usable: Vec<f64> = daily_volumes
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .collect();
    let avg_daily_volume = (!usable.is_empty()).then(|| usable.iter().mean());
    let volume_trend = match avg_daily_volume {
        Some(avg) if usable.len() > TREND_WINDOW && avg > 0.0 => {
            let recent = usable[usable.len() - TREND_WINDOW..].iter().mean();
            Some(recent / avg - 1.0)
        }
        _ => None,
    };

    tracing::debug!(
        total_volume = total_volume,
        total_open_interest = total_open_interest,
        strikes = by_strike.len(),
        "volume analysis"
    );

    VolumeAnalysis {
        total_volume,
        total_open_interest,
        by_strike,
        avg_daily_volume,
        volume_trend,
    }
}
