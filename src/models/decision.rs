//! Trading decision returned by the decision service for one cycle.

use rust_decimal::Decimal;
use serde::Serialize;

use super::TradeSide;

/// Placeholder analysis shown when the model returns nothing usable.
pub const EMPTY_ANALYSIS_PLACEHOLDER: &str = "Analyzing market conditions...";

/// A validated request to open a new trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeProposal {
    pub pair: String,
    pub side: TradeSide,
    pub volume: Decimal,
    pub entry_price: Decimal,
    pub reasoning: String,
}

/// What the bot should do this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecisionAction {
    OpenTrade(TradeProposal),
    /// Close an open trade. The id is resolved by the ledger, unknown ids are ignored.
    CloseTrade { trade_id: String },
    Hold,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::OpenTrade(_) => "OPEN_TRADE",
            DecisionAction::CloseTrade { .. } => "CLOSE_TRADE",
            DecisionAction::Hold => "HOLD",
        }
    }
}

/// Action plus the free-text market analysis that came with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub action: DecisionAction,
    pub analysis: String,
}

impl Decision {
    /// HOLD with the given analysis, or the placeholder when it is blank.
    pub fn hold(analysis: impl Into<String>) -> Self {
        let analysis = analysis.into();
        let analysis = if analysis.trim().is_empty() {
            EMPTY_ANALYSIS_PLACEHOLDER.to_string()
        } else {
            analysis
        };
        Self {
            action: DecisionAction::Hold,
            analysis,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self.action, DecisionAction::Hold)
    }
}
