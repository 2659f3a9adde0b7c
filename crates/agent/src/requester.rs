//! Adapts any [`Provider`] into a [`StructuredRequester`].
//!
//! The declared shape is both attached as the request's `response_format`
//! and spelled out at the end of the system prompt, since not every
//! OpenAI-compatible endpoint honours `response_format` for `anyOf` unions.
//! The reply body must be JSON; a fenced ```json block is accepted.

use async_trait::async_trait;
use schemagent_core::error::RequestError;
use schemagent_core::message::Turn;
use schemagent_core::provider::{Provider, ProviderRequest, ResponseFormat};
use schemagent_core::structured::StructuredRequester;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub struct ProviderRequester {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ProviderRequester {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    fn build_request(&self, prompt: &str, transcript: &[Turn], format: &ResponseFormat) -> ProviderRequest {
        let schema = serde_json::to_string_pretty(&format.schema).unwrap_or_else(|_| format.schema.to_string());
        let system = format!("{prompt}\n\n# RESPONSE SCHEMA\nReply with one JSON value that satisfies:\n{schema}");

        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(Turn::system(system));
        messages.extend_from_slice(transcript);

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: Some(format.clone()),
        }
    }
}

#[async_trait]
impl StructuredRequester for ProviderRequester {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn request(
        &self,
        prompt: &str,
        transcript: &[Turn],
        format: &ResponseFormat,
    ) -> Result<Value, RequestError> {
        let request = self.build_request(prompt, transcript, format);
        debug!(
            provider = self.provider.name(),
            model = %self.model,
            shape = %format.name,
            messages = request.messages.len(),
            "Issuing structured request"
        );
        let response = self.provider.complete(request).await?;
        parse_payload(&response.message.content)
    }
}

/// Parse a reply body as JSON, unwrapping a Markdown code fence if present.
pub fn parse_payload(body: &str) -> Result<Value, RequestError> {
    let text = strip_fence(body.trim());
    serde_json::from_str(text).map_err(|e| {
        RequestError::InvalidPayload(format!("reply is not valid JSON ({e}): {}", preview(body)))
    })
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (`json`, `JSON`, or nothing) up to the first newline.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(body: &str) -> String {
    const LIMIT: usize = 120;
    match body.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
