pub mod metrics;
pub mod sizing;
