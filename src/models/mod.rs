//! Data models for quotes, trades, decisions and account history.

mod account;
mod decision;
mod quote;
mod trade;

pub use account::{EquityHistory, EquitySample, DEFAULT_HISTORY_CAPACITY};
pub use decision::{Decision, DecisionAction, TradeProposal, EMPTY_ANALYSIS_PLACEHOLDER};
pub use quote::{InstrumentQuote, Trend};
pub use trade::{Trade, TradeSide, TradeStatus};
