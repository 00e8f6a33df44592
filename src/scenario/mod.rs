pub mod breakeven;
pub mod simulator;
