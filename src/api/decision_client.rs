//! Decision service client: one prompt in, one validated decision out.

use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::Credentials;
use crate::models::{Decision, InstrumentQuote, Trade};
use crate::trading::TradingConfig;

use super::error::DecisionError;
use super::parser::parse_decision;
use super::prompt::build_prompt;
use super::transport::CompletionTransport;

/// Default upper bound on one decision request.
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(8);

/// Asks the reasoning service for the next trading action.
pub struct DecisionClient<T> {
    transport: T,
    rules: TradingConfig,
    timeout: Duration,
}

impl<T: CompletionTransport> DecisionClient<T> {
    pub fn new(transport: T, rules: TradingConfig, timeout: Duration) -> Self {
        Self {
            transport,
            rules,
            timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Request a decision for the current market and open trades.
    ///
    /// A missing API key is rejected before anything is sent. Transport and
    /// HTTP status failures propagate. Unparseable output and timeouts become HOLD.
    pub async fn request_decision(
        &self,
        snapshot: &[InstrumentQuote],
        trades: &[Trade],
        balance: Decimal,
        credentials: &Credentials,
    ) -> Result<Decision, DecisionError> {
        let api_key = credentials.gemini_api_key.trim();
        if api_key.is_empty() {
            return Err(DecisionError::MissingApiKey);
        }

        let prompt = build_prompt(snapshot, trades, balance, &self.rules);
        debug!(
            quotes = snapshot.len(),
            open_trades = trades.iter().filter(|t| t.is_open()).count(),
            "Requesting trading decision"
        );

        let completion =
            match tokio::time::timeout(self.timeout, self.transport.complete(api_key, &prompt)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(timeout_secs = self.timeout.as_secs_f64(), "Decision request timed out, holding");
                    return Ok(Decision::hold(format!(
                        "Decision service did not respond within {:.1}s; holding this cycle.",
                        self.timeout.as_secs_f64()
                    )));
                }
            };

        let decision = parse_decision(&completion);
        info!(action = decision.action.as_str(), "Received trading decision");

        Ok(decision)
    }
}
