//! Structured-request collaborator: the one suspending call in a turn.
//!
//! The orchestrator hands a fully assembled system prompt, the transcript
//! and a declared [`ResponseFormat`] to a [`StructuredRequester`] and gets
//! back raw structured data. Whether that data actually conforms is checked
//! afterwards by the schema registry; the requester only promises it is
//! JSON or an explicit [`RequestError`].

use async_trait::async_trait;
use serde_json::Value;
use crate::error::RequestError;
use crate::message::Turn;
use crate::provider::ResponseFormat;

#[async_trait]
pub trait StructuredRequester: Send + Sync {
    /// A human-readable name for diagnostics.
    fn name(&self) -> &str;

    /// Issue one structured request.
    ///
    /// `prompt` is the system prompt; `transcript` is the conversation so far
    /// (oldest first, not including the system prompt).
    async fn request(
        &self,
        prompt: &str,
        transcript: &[Turn],
        format: &ResponseFormat,
    ) -> std::result::Result<Value, RequestError>;
}
