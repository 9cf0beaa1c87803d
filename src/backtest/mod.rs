pub mod metrics;
pub mod models;
pub mod simulator;
pub mod strategies;

pub use metrics::BacktestMetrics;
pub use models::{BacktestRun, BacktestTrade};
pub use simulator::{BacktestConfig, BacktestSimulator};
pub use strategies::Strategy;
