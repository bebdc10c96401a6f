//! Errors surfaced by the decision service client.

/// Failures that abort a trading cycle.
///
/// Malformed model output is not an error; it degrades to a HOLD decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// Rejected before any request was made.
    #[error("Gemini API key is required")]
    MissingApiKey,

    #[error("Decision service request failed: {0}")]
    Transport(String),

    #[error("Decision service returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl DecisionError {
    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_input(&self) -> bool {
        matches!(self, DecisionError::MissingApiKey)
    }
}
