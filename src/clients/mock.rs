use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::{core::LowLevelClient, error::AIError};

/// A scripted reply for `MockClient`.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(String),
    /// Reply after sleeping, for timeout and interleaving scenarios.
    Delayed(Duration, String),
}

/// Shared control surface for a `MockClient`: queue replies, inspect prompts.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
    fallback: Mutex<Option<String>>,
}

impl MockHandle {
    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner).push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner).extend(responses);
    }

    /// Reply used once the queue is empty.
    pub fn set_fallback(&self, text: impl Into<String>) {
        *self.fallback.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.into());
    }

    /// Number of model calls made so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn next(&self, prompt: String) -> Option<MockResponse> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(prompt);
        let queued = self.responses.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        queued.or_else(|| {
            self.fallback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
                .map(MockResponse::Success)
        })
    }
}

/// Mock client for tests and offline play.
#[derive(Debug, Clone)]
pub struct MockClient {
    handle: Arc<MockHandle>,
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = Self::new();
        handle.add_responses(responses);
        (client, handle)
    }

    pub fn with_fallback(text: impl Into<String>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = Self::new();
        handle.set_fallback(text);
        (client, handle)
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, prompt: String) -> Result<String, AIError> {
        match self.handle.next(prompt) {
            Some(MockResponse::Success(text)) => Ok(text),
            Some(MockResponse::Error(message)) => Err(AIError::Mock(message)),
            Some(MockResponse::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            None => Err(AIError::Mock("no mock responses queued".to_string())),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_fallback() {
        let (client, handle) = MockClient::with_responses(vec![
            MockResponse::Success("one".into()),
            MockResponse::Error("boom".into()),
        ]);

        assert_eq!(client.ask_raw("a".into()).await.unwrap(), "one");
        assert!(matches!(client.ask_raw("b".into()).await, Err(AIError::Mock(m)) if m == "boom"));
        assert!(client.ask_raw("c".into()).await.is_err());

        handle.set_fallback("again");
        assert_eq!(client.ask_raw("d".into()).await.unwrap(), "again");
        assert_eq!(handle.call_count(), 4);
        assert_eq!(handle.prompts(), vec!["a", "b", "c", "d"]);
    }
}
