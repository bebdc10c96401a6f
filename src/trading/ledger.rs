//! In-memory ledger of simulated trades and the account they belong to.
//!
//! All state transitions of the mock account happen here:
//! - opening trades from validated proposals
//! - closing trades and realizing their profit into the balance
//! - per-cycle price perturbation of open trades
//! - equity calculation and the bounded equity history

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{EquityHistory, Trade, TradeProposal, TradeStatus};

use super::LedgerConfig;

/// Decimal places kept on simulated prices.
const PRICE_DP: u32 = 6;

/// Trades, balance and equity history of the simulated account.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    trades: Vec<Trade>,
    balance: Decimal,
    total_profit: Decimal,
    history: EquityHistory,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            balance: config.initial_balance,
            total_profit: Decimal::ZERO,
            trades: Vec::new(),
            history: EquityHistory::with_capacity(config.history_capacity),
            config,
        }
    }

    /// Realized cash balance.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Cumulative realized profit.
    pub fn total_profit(&self) -> Decimal {
        self.total_profit
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Every trade ever opened, in opening order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades().iter().filter(|t| t.is_open())
    }

    pub fn closed_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades().iter().filter(|t| t.status == TradeStatus::Closed)
    }

    pub fn open_trade_count(&self) -> usize {
        self.open_trades().count()
    }

    pub fn history(&self) -> &EquityHistory {
        &self.history
    }

    /// Open a new trade at the proposed entry price.
    ///
    /// Advisory limits are not enforced; exceeding the open-trade ceiling only logs.
    pub fn apply_open(&mut self, proposal: &TradeProposal) -> Trade {
        let trade = Trade {
            id: Uuid::new_v4().to_string(),
            pair: proposal.pair.clone(),
            side: proposal.side,
            entry_price: proposal.entry_price,
            current_price: proposal.entry_price,
            volume: proposal.volume,
            profit: Decimal::ZERO,
            timestamp: Utc::now(),
            status: TradeStatus::Open,
            ai_reasoning: proposal.reasoning.clone(),
        };

        self.trades.push(trade.clone());

        info!(
            id = %trade.id,
            pair = %trade.pair,
            side = trade.side.as_str(),
            volume = %trade.volume,
            entry = %trade.entry_price,
            "Opened trade"
        );

        let open = self.open_trade_count();
        if open > self.config.advisory_max_open_trades {
            warn!(
                open = open,
                advised_max = self.config.advisory_max_open_trades,
                "Open trades exceed the advised ceiling"
            );
        }

        trade
    }

    /// Close the open trade with `trade_id` and realize its profit.
    ///
    /// Returns the realized amount, or `None` when no open trade has that id.
    pub fn apply_close(&mut self, trade_id: &str) -> Option<Decimal> {
        let trade = self
            .trades
            .iter_mut()
            .find(|t| t.is_open() && t.id == trade_id)?;

        let realized = trade.close()?;
        self.balance += realized;
        self.total_profit += realized;

        info!(
            id = %trade_id,
            pair = %trade.pair,
            realized = %realized,
            balance = %self.balance,
            "Closed trade"
        );

        Some(realized)
    }

    /// Nudge every open trade's price and recompute its profit.
    pub fn revaluate<R: Rng>(&mut self, rng: &mut R) {
        let jitter = self.config.price_jitter;
        let pips_per_unit = self.config.pips_per_unit;
        let pip_value = self.config.pip_value;

        for trade in self.trades.iter_mut().filter(|t| t.is_open()) {
            let delta = (rng.gen::<f64>() - 0.5) * jitter;
            let factor = Decimal::try_from(1.0 + delta)
                .map(|f| f.round_dp(12))
                .unwrap_or(Decimal::ONE);
            let repriced = trade
                .current_price
                .checked_mul(factor)
                .map(|price| price.round_dp(PRICE_DP))
                .is_some_and(|price| trade.reprice(price, pips_per_unit, pip_value));

            if repriced {
                debug!(
                    id = %trade.id,
                    price = %trade.current_price,
                    profit = %trade.profit,
                    "Revalued trade"
                );
            } else {
                warn!(id = %trade.id, price = %trade.current_price, "Price move overflowed, keeping last valuation");
            }
        }
    }

    /// Sum of profit over open trades.
    pub fn unrealized_profit(&self) -> Decimal {
        self.open_trades().map(|t| t.profit).sum()
    }

    /// Balance plus unrealized profit of open trades.
    pub fn equity(&self) -> Decimal {
        self.balance + self.unrealized_profit()
    }

    pub fn append_history_sample(&mut self, timestamp: DateTime<Utc>, equity: Decimal) {
        self.history.push(timestamp, equity);
    }

    #[cfg(test)]
    pub(crate) fn trade_mut(&mut self, trade_id: &str) -> Option<&mut Trade> {
        self.trades.iter_mut().find(|t| t.id == trade_id)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
