//! Shared test helpers: scripted collaborators.

use async_trait::async_trait;
use schemagent_core::error::{ProviderError, RequestError};
use schemagent_core::message::Turn;
use schemagent_core::provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, Usage};
use schemagent_core::structured::StructuredRequester;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One call observed by [`ScriptedRequester`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub prompt: String,
    pub transcript: Vec<Turn>,
    pub format: ResponseFormat,
}

/// A structured requester that returns a scripted sequence of outcomes.
///
/// Panics if more calls are made than outcomes provided.
pub struct ScriptedRequester {
    outcomes: Mutex<VecDeque<Result<Value, RequestError>>>,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedRequester {
    pub fn new(outcomes: Vec<Result<Value, RequestError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every outcome succeeds with the given values, in order.
    pub fn values(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(Ok).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredRequester for ScriptedRequester {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn request(
        &self,
        prompt: &str,
        transcript: &[Turn],
        format: &ResponseFormat,
    ) -> Result<Value, RequestError> {
        self.calls.lock().unwrap().push(RecordedRequest {
            prompt: prompt.to_string(),
            transcript: transcript.to_vec(),
            format: format.clone(),
        });
        let mut outcomes = self.outcomes.lock().unwrap();
        let call = self.calls.lock().unwrap().len();
        outcomes
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedRequester: no more outcomes (call #{call})"))
    }
}

/// A requester whose request never completes; for cancellation and timeouts.
pub struct PendingRequester;

#[async_trait]
impl StructuredRequester for PendingRequester {
    fn name(&self) -> &str {
        "pending"
    }

    async fn request(&self, _: &str, _: &[Turn], _: &ResponseFormat) -> Result<Value, RequestError> {
        std::future::pending().await
    }
}

/// A provider returning scripted text replies and recording each request.
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn replies(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("MockProvider: no more replies"))?;
        Ok(ProviderResponse {
            message: Turn::assistant(reply),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}
