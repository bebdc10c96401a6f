//! Broker connector interface.
//!
//! Only a simulated MetaTrader 5 connector exists. Nothing in the trading
//! cycle routes orders through it; the CLI exercises it directly.

mod mt5;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::TradeSide;

pub use mt5::SimulatedMt5Connector;

/// Errors that can occur during broker operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("Not connected to MT5")]
    NotConnected,
    #[error("Order rejected: {0}")]
    OrderRejected(String),
}

/// Login details for an MT5 account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mt5Config {
    pub server: String,
    pub login: String,
    pub password: String,
}

/// Two-sided price for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrokerQuote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl BrokerQuote {
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Fill price for `side`: buys lift the ask, sells hit the bid.
    pub fn fill_price(&self, side: TradeSide) -> Decimal {
        match side {
            TradeSide::Buy => self.ask,
            TradeSide::Sell => self.bid,
        }
    }
}

/// A position as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerTrade {
    pub ticket: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub volume: Decimal,
    pub open_price: Decimal,
    pub current_price: Decimal,
    pub profit: Decimal,
    pub open_time: DateTime<Utc>,
}

/// A broker adapter that can quote, open and close positions.
///
/// Every method except `connect` fails with [`BrokerError::NotConnected`]
/// until a connection has been established.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&mut self) -> Result<(), BrokerError>;

    async fn disconnect(&mut self) -> Result<(), BrokerError>;

    fn is_connected(&self) -> bool;

    async fn get_balance(&self) -> Result<Decimal, BrokerError>;

    async fn get_price(&self, symbol: &str) -> Result<BrokerQuote, BrokerError>;

    /// Open a market position. `None` when the broker declines the order.
    async fn open_trade(
        &mut self,
        symbol: &str,
        side: TradeSide,
        volume: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<Option<BrokerTrade>, BrokerError>;

    /// Close the position with `ticket`. Returns whether it was open.
    async fn close_trade(&mut self, ticket: u64) -> Result<bool, BrokerError>;

    async fn get_open_trades(&self) -> Result<Vec<BrokerTrade>, BrokerError>;
}
