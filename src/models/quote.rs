//! Synthetic market quote for a single currency pair.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Short-term direction label attached to a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "BULLISH",
            Trend::Bearish => "BEARISH",
        }
    }
}

/// One instrument in a market snapshot. Regenerated every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentQuote {
    /// Currency pair, e.g. "EUR/USD"
    pub pair: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Fractional 24h change
    #[serde(rename = "change24h")]
    pub change_24h: f64,

    pub volatility: f64,

    pub trend: Trend,
}
