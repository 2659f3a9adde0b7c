//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a transcript to a language model and get a
//! reply back. When a [`ResponseFormat`] is attached, the provider asks the
//! model to answer with JSON conforming to it.
//!
//! Implementations: OpenAI-compatible endpoints (see `schemagent-providers`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Turn;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// The transcript, system prompt first
    pub messages: Vec<Turn>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Constrain the reply to JSON matching this schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A JSON-schema response constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// A short identifier for the shape (or union) being requested
    pub name: String,

    /// JSON Schema document the reply must satisfy
    pub schema: serde_json::Value,
}

/// A tool summary used for prompts and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// Name of the registered input schema
    pub input_schema: String,

    /// Name of the registered output schema
    pub output_schema: String,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant turn
    pub message: Turn,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The structured requester calls `complete()` without knowing which
/// backend is in use. Retries, if any, are the provider's own policy.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_defaults() {
        let req: ProviderRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.response_format.is_none());
        assert_eq!(req.messages[0], Turn::user("hi"));
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "calculator".into(),
            description: "Evaluate arithmetic".into(),
            input_schema: "calculator_input".into(),
            output_schema: "calculator_output".into(),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("calculator_input"));
        assert!(json.contains("calculator_output"));
    }
}
