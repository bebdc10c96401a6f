//! Prompt construction for the decision service.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{InstrumentQuote, Trade};
use crate::trading::TradingConfig;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

fn pct(fraction: Decimal) -> Decimal {
    (fraction * Decimal::ONE_HUNDRED).normalize()
}

/// Build the single-turn prompt for one trading cycle.
///
/// Only trades that are still open are included. The rules are guidance for
/// the model; nothing downstream enforces them.
pub fn build_prompt(
    snapshot: &[InstrumentQuote],
    trades: &[Trade],
    balance: Decimal,
    rules: &TradingConfig,
) -> String {
    let open_trades: Vec<&Trade> = trades.iter().filter(|t| t.is_open()).collect();

    format!(
        r#"You are an expert forex trading AI. Analyze the current market conditions and make a trading decision.

Current Market Data:
{market}

Current Open Trades:
{open}

Account Balance: ${balance:.2}

Trading Rules:
1. Maximum {max_open} open trades at a time
2. Risk no more than {risk}% per trade
3. Use proper risk management and stop losses
4. Focus on high-probability setups
5. Consider trend, volatility, and price action
6. Take profit when target is reached (typically {tp_min}-{tp_max}% gain)
7. Close losing trades early to minimize losses

Your task:
1. Analyze the market data and current positions
2. Decide if you should: OPEN_TRADE, CLOSE_TRADE, or HOLD
3. If opening a trade, specify: pair, type (BUY/SELL), volume ({min_vol}-{max_vol}), entry price, and reasoning
4. If closing a trade, specify: trade ID and reasoning
5. Provide detailed market analysis

Response format (JSON):
{{
  "action": "OPEN_TRADE" | "CLOSE_TRADE" | "HOLD",
  "analysis": "Your detailed market analysis...",
  "trade": {{
    "pair": "EUR/USD",
    "type": "BUY" | "SELL",
    "volume": 0.5,
    "entryPrice": 1.1234,
    "reasoning": "Why this trade..."
  }},
  "tradeId": "id_to_close" (only if CLOSE_TRADE)
}}

Respond ONLY with valid JSON, no markdown formatting."#,
        market = to_json(snapshot),
        open = to_json(&open_trades),
        balance = balance,
        max_open = rules.max_open_trades,
        risk = pct(rules.max_risk_per_trade),
        tp_min = pct(rules.take_profit_min),
        tp_max = pct(rules.take_profit_max),
        min_vol = rules.min_volume,
        max_vol = rules.max_volume,
    )
}
