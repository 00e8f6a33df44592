pub mod advisor;
pub mod config;
pub mod errors;
pub mod feeds;
pub mod models;
pub mod risk;
pub mod scenario;
pub mod server;
pub mod state;
pub mod strategy;
pub mod types;
