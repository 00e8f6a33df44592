pub mod black_scholes;
pub mod volatility;

/// Days in the year used to convert days-to-expiry and per-year theta.
pub const CALENDAR_DAYS: f64 = 365.0;

/// Precomputed Black-Scholes inputs. Stack-allocated, Copy.
#[derive(Debug, Clone, Copy)]
pub struct ModelParams {
    pub spot: f64,
    pub strike: f64,
    pub t_years: f64,
    pub sigma: f64,
    pub rate: f64,
    // Precomputed
    pub sqrt_t: f64,
    pub sigma_sqrt_t: f64,
    pub discount: f64,
    pub d1: f64,
    pub d2: f64,
}

impl ModelParams {
    #[inline]
    pub fn new(spot: f64, strike: f64, t_years: f64, sigma: f64, rate: f64) -> Self {
        let sqrt_t = t_years.sqrt();
        let sigma_sqrt_t = sigma * sqrt_t;
        let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t_years) / sigma_sqrt_t;
        let d2 = d1 - sigma_sqrt_t;
        Self {
            spot,
            strike,
            t_years,
            sigma,
            rate,
            sqrt_t,
            sigma_sqrt_t,
            discount: (-rate * t_years).exp(),
            d1,
            d2,
        }
    }
}
