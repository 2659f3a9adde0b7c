//! # schemagent core
//!
//! Domain types, traits, and error definitions for the schemagent
//! orchestration runtime. This crate has no I/O of its own: it defines the
//! model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language-model provider, structured
//! requester, tool) is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod schema;
pub mod tool;
pub mod memory;
pub mod provider;
pub mod structured;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{
    Constraint, Error, MemoryError, ProviderError, RequestError, Result, SchemaError, ToolError,
    Violation,
};
pub use message::{Role, SessionId, Turn};
pub use schema::{FieldSpec, FieldType, Schema, SchemaRegistry};
pub use tool::{Tool, ToolInvocation, ToolRegistry};
pub use memory::ConversationMemory;
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, ToolDefinition, Usage};
pub use structured::StructuredRequester;
pub use event::{DomainEvent, EventBus};
