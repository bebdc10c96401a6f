//! Synthetic market data.

mod simulator;

pub use simulator::MarketSimulator;
