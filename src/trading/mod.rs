//! Trading state: account ledger and trading rules.

mod config;
mod ledger;

pub use config::{LedgerConfig, TradingConfig};
pub use ledger::Ledger;
