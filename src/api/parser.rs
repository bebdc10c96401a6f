//! Parsing and validation of the model's completion text.
//!
//! The completion is untrusted input. Anything that fails to parse or
//! validate becomes a HOLD carrying the raw text as its analysis.

use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{Decision, DecisionAction, TradeProposal, TradeSide};

use super::types::{RawDecision, RawTrade};

/// Largest lot size accepted from the model.
const MAX_VOLUME: f64 = 100.0;

/// Largest entry price accepted from the model. Covers every quoted FX pair.
const MAX_ENTRY_PRICE: f64 = 1_000_000.0;

/// Decimal places kept on volumes and prices from the model.
const MODEL_VALUE_DP: u32 = 8;

/// Why a syntactically valid decision was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionRejection {
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("OPEN_TRADE without a trade object")]
    MissingTrade,
    #[error("CLOSE_TRADE without a usable tradeId")]
    MissingTradeId,
    #[error("trade has no pair")]
    EmptyPair,
    #[error("invalid trade side {0:?}")]
    InvalidSide(String),
    #[error("invalid volume {0}")]
    InvalidVolume(f64),
    #[error("invalid entry price {0}")]
    InvalidEntryPrice(f64),
}

/// Remove markdown code fences around the JSON payload.
pub fn strip_code_fence(text: &str) -> String {
    text.replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Turn a completion into a decision. Never fails.
pub fn parse_decision(completion: &str) -> Decision {
    let cleaned = strip_code_fence(completion);

    let raw: RawDecision = match serde_json::from_str(&cleaned) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Failed to parse decision, holding");
            return Decision::hold(completion);
        }
    };

    match validate(raw) {
        Ok(decision) => decision,
        Err(rejection) => {
            warn!(reason = %rejection, "Rejected decision, holding");
            Decision::hold(completion)
        }
    }
}

/// Check every field the ledger will consume.
pub fn validate(raw: RawDecision) -> Result<Decision, DecisionRejection> {
    let analysis = raw.analysis.unwrap_or_default();

    let action = match raw.action.trim().to_uppercase().as_str() {
        "HOLD" => DecisionAction::Hold,
        "OPEN_TRADE" => {
            let trade = raw.trade.ok_or(DecisionRejection::MissingTrade)?;
            DecisionAction::OpenTrade(validate_trade(trade)?)
        }
        "CLOSE_TRADE" => {
            let trade_id = raw
                .trade_id
                .as_ref()
                .and_then(trade_id_from_value)
                .ok_or(DecisionRejection::MissingTradeId)?;
            DecisionAction::CloseTrade { trade_id }
        }
        other => return Err(DecisionRejection::UnknownAction(other.to_string())),
    };

    Ok(Decision { action, analysis })
}

fn validate_trade(trade: RawTrade) -> Result<TradeProposal, DecisionRejection> {
    let pair = trade.pair.trim().to_string();
    if pair.is_empty() {
        return Err(DecisionRejection::EmptyPair);
    }

    let side = TradeSide::parse(&trade.side)
        .ok_or_else(|| DecisionRejection::InvalidSide(trade.side.clone()))?;

    let volume = bounded_decimal(trade.volume, MAX_VOLUME)
        .ok_or(DecisionRejection::InvalidVolume(trade.volume))?;
    let entry_price = bounded_decimal(trade.entry_price, MAX_ENTRY_PRICE)
        .ok_or(DecisionRejection::InvalidEntryPrice(trade.entry_price))?;

    Ok(TradeProposal {
        pair,
        side,
        volume,
        entry_price,
        reasoning: trade.reasoning,
    })
}

/// Convert to a decimal in `(0, max]`, still non-zero after rounding.
fn bounded_decimal(value: f64, max: f64) -> Option<Decimal> {
    if !value.is_finite() || value <= 0.0 || value > max {
        return None;
    }
    Decimal::try_from(value)
        .ok()
        .map(|d| d.round_dp(MODEL_VALUE_DP).normalize())
        .filter(|d| !d.is_zero())
}

fn trade_id_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
