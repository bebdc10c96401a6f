//! Simulated MetaTrader 5 connector.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::models::TradeSide;

use super::{BrokerConnector, BrokerError, BrokerQuote, BrokerTrade, Mt5Config};

const SIMULATED_BALANCE: Decimal = dec!(10000);
const SIMULATED_SPREAD: Decimal = dec!(0.0001);

/// Stand-in for an MT5 bridge. Connecting always succeeds and prices are random.
pub struct SimulatedMt5Connector {
    config: Mt5Config,
    connected: bool,
    open_trades: BTreeMap<u64, BrokerTrade>,
    last_ticket: u64,
}

impl SimulatedMt5Connector {
    pub fn new(config: Mt5Config) -> Self {
        Self {
            config,
            connected: false,
            open_trades: BTreeMap::new(),
            last_ticket: 0,
        }
    }

    pub fn config(&self) -> &Mt5Config {
        &self.config
    }

    fn ensure_connected(&self) -> Result<(), BrokerError> {
        if self.connected {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }

    /// Millisecond timestamp, bumped when two orders land in the same millisecond.
    fn next_ticket(&mut self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.last_ticket = now.max(self.last_ticket + 1);
        self.last_ticket
    }
}

#[async_trait]
impl BrokerConnector for SimulatedMt5Connector {
    async fn connect(&mut self) -> Result<(), BrokerError> {
        info!(server = %self.config.server, login = %self.config.login, "Connecting to MT5");
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        self.connected = false;
        info!("Disconnected from MT5");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn get_balance(&self) -> Result<Decimal, BrokerError> {
        self.ensure_connected()?;
        Ok(SIMULATED_BALANCE)
    }

    async fn get_price(&self, symbol: &str) -> Result<BrokerQuote, BrokerError> {
        self.ensure_connected()?;

        let base = rand::thread_rng().gen_range(1.0..1.5);
        let bid = Decimal::try_from(base)
            .map_err(|e| BrokerError::OrderRejected(format!("Bad price for {}: {}", symbol, e)))?
            .round_dp(5);

        Ok(BrokerQuote {
            bid,
            ask: bid + SIMULATED_SPREAD,
        })
    }

    async fn open_trade(
        &mut self,
        symbol: &str,
        side: TradeSide,
        volume: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<Option<BrokerTrade>, BrokerError> {
        self.ensure_connected()?;

        let quote = self.get_price(symbol).await?;
        let open_price = quote.fill_price(side);
        let now = Utc::now();

        let trade = BrokerTrade {
            ticket: self.next_ticket(),
            symbol: symbol.to_string(),
            side,
            volume,
            open_price,
            current_price: open_price,
            profit: Decimal::ZERO,
            open_time: now,
        };

        info!(
            ticket = trade.ticket,
            symbol = %symbol,
            side = side.as_str(),
            volume = %volume,
            price = %open_price,
            "Opened MT5 trade"
        );
        debug!(stop_loss = ?stop_loss, take_profit = ?take_profit, "Protective levels not simulated");

        self.open_trades.insert(trade.ticket, trade.clone());
        Ok(Some(trade))
    }

    async fn close_trade(&mut self, ticket: u64) -> Result<bool, BrokerError> {
        self.ensure_connected()?;

        let closed = self.open_trades.remove(&ticket).is_some();
        info!(ticket = ticket, closed = closed, "Closed MT5 trade");
        Ok(closed)
    }

    async fn get_open_trades(&self) -> Result<Vec<BrokerTrade>, BrokerError> {
        self.ensure_connected()?;
        Ok(self.open_trades.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn connector() -> SimulatedMt5Connector {
        SimulatedMt5Connector::new(Mt5Config {
            server: "MetaQuotes-Demo".to_string(),
            login: "5012345".to_string(),
            password: "secret".to_string(),
        })
    }

    #[tokio::test]
    async fn test_everything_fails_before_connect() {
        let mut mt5 = connector();

        assert!(!mt5.is_connected());
        assert_eq!(mt5.get_balance().await, Err(BrokerError::NotConnected));
        assert_eq!(mt5.get_price("EUR/USD").await, Err(BrokerError::NotConnected));
        assert_err!(mt5.open_trade("EUR/USD", TradeSide::Buy, dec!(0.1), None, None).await);
        assert_eq!(mt5.close_trade(1).await, Err(BrokerError::NotConnected));
        assert_err!(mt5.get_open_trades().await);
        assert_eq!(mt5.disconnect().await, Err(BrokerError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_then_quote() {
        let mut mt5 = connector();
        assert_ok!(mt5.connect().await);

        assert_eq!(mt5.get_balance().await, Ok(dec!(10000)));

        let quote = assert_ok!(mt5.get_price("EUR/USD").await);
        assert!(quote.bid >= dec!(1.0) && quote.bid <= dec!(1.5));
        assert_eq!(quote.spread(), dec!(0.0001));
    }

    #[test]
    fn test_buy_fills_at_ask_and_sell_at_bid() {
        let quote = BrokerQuote {
            bid: dec!(1.1000),
            ask: dec!(1.1001),
        };
        assert_eq!(quote.fill_price(TradeSide::Buy), dec!(1.1001));
        assert_eq!(quote.fill_price(TradeSide::Sell), dec!(1.1000));
    }

    #[tokio::test]
    async fn test_open_and_close_trade() {
        let mut mt5 = connector();
        mt5.connect().await.unwrap();

        let first = mt5
            .open_trade("EUR/USD", TradeSide::Buy, dec!(0.5), Some(dec!(1.09)), Some(dec!(1.12)))
            .await
            .unwrap()
            .unwrap();
        let second = mt5
            .open_trade("GBP/USD", TradeSide::Sell, dec!(0.2), None, None)
            .await
            .unwrap()
            .unwrap();

        assert!(second.ticket > first.ticket);
        assert_eq!(first.current_price, first.open_price);
        assert_eq!(first.profit, Decimal::ZERO);
        assert_eq!(mt5.get_open_trades().await.unwrap().len(), 2);

        assert_eq!(mt5.close_trade(first.ticket).await, Ok(true));
        assert_eq!(mt5.close_trade(first.ticket).await, Ok(false));
        assert_eq!(mt5.get_open_trades().await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_disconnect_blocks_further_calls() {
        let mut mt5 = connector();
        mt5.connect().await.unwrap();
        assert_ok!(mt5.disconnect().await);

        assert_eq!(mt5.get_balance().await, Err(BrokerError::NotConnected));
    }
}
