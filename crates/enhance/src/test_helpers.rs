//! Shared test helpers for pipeline tests.

use mastermind_core::error::{MemoryError, ProviderError};
use mastermind_core::memory::{AddAck, AddRequest, MemoryStore, SearchPayload, SearchRequest};
use mastermind_core::message::Message;
use mastermind_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock store that answers searches from a scripted queue.
///
/// Each call to `search` pops the next outcome and records the request.
/// Panics if more calls are made than outcomes provided.
pub struct ScriptedMemoryStore {
    outcomes: Mutex<Vec<Result<SearchPayload, MemoryError>>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedMemoryStore {
    pub fn new(outcomes: Vec<Result<SearchPayload, MemoryError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A store whose every scripted search comes back empty.
    pub fn empty(calls: usize) -> Self {
        Self::new((0..calls).map(|_| Ok(SearchPayload::default())).collect())
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl MemoryStore for ScriptedMemoryStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPayload, MemoryError> {
        let mut requests = self.requests.lock().unwrap();
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            panic!(
                "ScriptedMemoryStore: no more outcomes (call #{})",
                requests.len()
            );
        }
        requests.push(request.clone());
        outcomes.remove(0)
    }

    async fn add(&self, _request: AddRequest) -> Result<AddAck, MemoryError> {
        Ok(AddAck::default())
    }
}

/// A mock provider that returns scripted completions and records requests.
pub struct ScriptedProvider {
    outcomes: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers once with `text`.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// A provider that must never be called.
    pub fn unused() -> Self {
        Self::new(Vec::new())
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            panic!("ScriptedProvider: no more responses (call #{})", requests.len());
        }
        requests.push(request);
        outcomes.remove(0).map(|text| make_text_response(&text))
    }
}

/// Create a simple assistant response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}
