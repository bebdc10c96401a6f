//! In-memory transport for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::error::DecisionError;
use super::transport::CompletionTransport;

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Status(u16),
    NetworkError,
}

/// Replays canned replies and records what it was asked.
///
/// Queued replies are used in order; the last one repeats once the queue drains.
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    api_keys: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn sequence(replies: Vec<Reply>) -> Self {
        let fallback = replies
            .last()
            .cloned()
            .unwrap_or_else(|| Reply::Text(String::new()));
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            api_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::sequence(vec![Reply::Text(text.to_string())])
    }

    pub fn status(code: u16) -> Self {
        Self::sequence(vec![Reply::Status(code)])
    }

    pub fn network_error() -> Self {
        Self::sequence(vec![Reply::NetworkError])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue another reply behind the pending ones.
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.api_keys.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionTransport for MockTransport {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, DecisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.api_keys.lock().unwrap().push(api_key.to_string());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Status(status) => Err(DecisionError::Status {
                status,
                body: "mock failure".to_string(),
            }),
            Reply::NetworkError => Err(DecisionError::Transport("connection refused".to_string())),
        }
    }
}
