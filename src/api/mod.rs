//! Decision service: prompt construction, Gemini transport and response parsing.

mod decision_client;
mod error;
mod parser;
mod prompt;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use decision_client::{DecisionClient, DEFAULT_DECISION_TIMEOUT};
pub use error::DecisionError;
pub use transport::{CompletionTransport, GeminiTransport};
