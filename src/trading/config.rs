//! Trading configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_HISTORY_CAPACITY;

/// Trading rules handed to the decision service.
///
/// These are advisory text in the prompt. Nothing in the ledger enforces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Maximum number of trades open at the same time
    pub max_open_trades: usize,

    /// Maximum fraction of balance risked on one trade (0.0 to 1.0)
    pub max_risk_per_trade: Decimal,

    /// Lower bound of the usual take-profit target (0.0 to 1.0)
    pub take_profit_min: Decimal,

    /// Upper bound of the usual take-profit target (0.0 to 1.0)
    pub take_profit_max: Decimal,

    /// Smallest suggested lot size
    pub min_volume: Decimal,

    /// Largest suggested lot size
    pub max_volume: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_open_trades: 3,
            max_risk_per_trade: dec!(0.02), // 2% per trade
            take_profit_min: dec!(0.02),
            take_profit_max: dec!(0.03),
            min_volume: dec!(0.1),
            max_volume: dec!(1.0),
        }
    }
}

/// Constants of the ledger's simulated account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Starting cash balance
    pub initial_balance: Decimal,

    /// Price units to pips (10000 for four-decimal pairs)
    pub pips_per_unit: Decimal,

    /// Account currency per pip per lot
    pub pip_value: Decimal,

    /// Width of the per-cycle multiplicative price jitter
    pub price_jitter: f64,

    /// Number of equity samples retained
    pub history_capacity: usize,

    /// Open-trade count above which the ledger warns (not enforced)
    pub advisory_max_open_trades: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(10000),
            pips_per_unit: dec!(10000),
            pip_value: dec!(10),
            price_jitter: 0.001,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            advisory_max_open_trades: TradingConfig::default().max_open_trades,
        }
    }
}
