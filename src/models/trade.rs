//! Trade model representing a simulated forex position opened by the bot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    /// Parse a side label, ignoring case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "BUY" => Some(TradeSide::Buy),
            "SELL" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

/// Lifecycle status of a trade. `Open` moves to `Closed` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

/// A simulated trade held in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Unique trade identifier (UUID v4)
    pub id: String,

    /// Currency pair, e.g. "EUR/USD"
    pub pair: String,

    /// Trade direction
    #[serde(rename = "type")]
    pub side: TradeSide,

    /// Price the trade was opened at
    #[serde(with = "rust_decimal::serde::float")]
    pub entry_price: Decimal,

    /// Latest simulated price
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,

    /// Lot size (0.1 to 1.0 by convention)
    #[serde(with = "rust_decimal::serde::float")]
    pub volume: Decimal,

    /// Unrealized profit while open, realized profit once closed
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,

    /// When the trade was opened
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    pub status: TradeStatus,

    /// Rationale supplied by the decision service
    #[serde(default)]
    pub ai_reasoning: String,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Pip distance from entry at `price`, positive when the move favours the trade.
    ///
    /// `None` if the result does not fit in a `Decimal`.
    pub fn pips_at(&self, price: Decimal, pips_per_unit: Decimal) -> Option<Decimal> {
        let diff = match self.side {
            TradeSide::Buy => price.checked_sub(self.entry_price)?,
            TradeSide::Sell => self.entry_price.checked_sub(price)?,
        };
        diff.checked_mul(pips_per_unit)
    }

    /// Profit at `price`, or `None` on overflow.
    pub fn profit_at(&self, price: Decimal, pips_per_unit: Decimal, pip_value: Decimal) -> Option<Decimal> {
        self.pips_at(price, pips_per_unit)?
            .checked_mul(self.volume)?
            .checked_mul(pip_value)
    }

    /// Move the trade to `price` and recompute profit.
    ///
    /// Closed trades are frozen. Returns `false` without touching the trade
    /// when it is closed or the new profit overflows.
    pub fn reprice(&mut self, price: Decimal, pips_per_unit: Decimal, pip_value: Decimal) -> bool {
        if !self.is_open() {
            return false;
        }
        let Some(profit) = self.profit_at(price, pips_per_unit, pip_value) else {
            return false;
        };
        self.current_price = price;
        self.profit = profit;
        true
    }

    /// Close the trade, returning the profit to realize. `None` if already closed.
    pub fn close(&mut self) -> Option<Decimal> {
        if !self.is_open() {
            return None;
        }
        self.status = TradeStatus::Closed;
        Some(self.profit)
    }
}
