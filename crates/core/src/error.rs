//! Error types for the schemagent domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them so a turn can fail with any of them.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The top-level error type for all schemagent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Schema errors ---
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Structured request errors ---
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    // --- Response union ---
    #[error("Response matched none of the declared shapes [{}]", .candidates.join(", "))]
    ResponseShapeMismatch {
        /// Union members, in declaration order.
        candidates: Vec<String>,
        /// Per-candidate validation failures, same order as `candidates`.
        diagnostics: Vec<SchemaError>,
    },

    // --- Conversation memory ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A single unmet constraint found while validating data against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Field path, e.g. `action_plan[0]` or `address.city`. Empty for the root value.
    pub path: String,

    /// The constraint that was not satisfied.
    pub constraint: Constraint,
}

impl Violation {
    pub fn new(path: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            path: path.into(),
            constraint,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: &str = if self.path.is_empty() { "<root>" } else { &self.path };
        write!(f, "{path}: {}", self.constraint)
    }
}

/// The kinds of constraints a schema can place on a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// A required field was absent (or null).
    Required,
    /// The value had the wrong JSON type.
    Type { expected: String, found: String },
    /// A sequence had fewer elements than allowed.
    MinItems { min: usize, found: usize },
    /// A string was not one of the allowed values.
    Enum { allowed: Vec<String> },
    /// A declared coercion was attempted and failed.
    Coercion { target: String },
    /// A field not declared by a strict schema was present.
    UnknownField,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "field is required"),
            Self::Type { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::MinItems { min, found } => {
                write!(f, "expected at least {min} item(s), found {found}")
            }
            Self::Enum { allowed } => write!(f, "value must be one of [{}]", allowed.join(", ")),
            Self::Coercion { target } => write!(f, "value cannot be coerced to {target}"),
            Self::UnknownField => write!(f, "field is not declared by the schema"),
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("Schema already registered: {0}")]
    Duplicate(String),

    #[error("Schema not registered: {0}")]
    NotRegistered(String),

    #[error("Schema {schema} references unregistered schema {reference} at {field}")]
    UnresolvedReference {
        schema: String,
        field: String,
        reference: String,
    },

    #[error("Validation against {schema} failed: {}", join_violations(.violations))]
    Validation {
        schema: String,
        violations: Vec<Violation>,
    },
}

impl SchemaError {
    /// The violations carried by a validation failure (empty for other variants).
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    Duplicate(String),

    #[error("Invalid input for {tool_name}: {source}")]
    InvalidInput {
        tool_name: String,
        #[source]
        source: SchemaError,
    },

    #[error("Tool {tool_name} produced output violating its declared shape: {source}")]
    InvalidOutput {
        tool_name: String,
        #[source]
        source: SchemaError,
    },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("Structured request timed out after {limit:?}")]
    Timeout { limit: Duration },

    #[error("Structured request was cancelled")]
    Cancelled,

    #[error("Provider returned a payload that is not structured data: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MemoryError {
    #[error("Failed to decode memory snapshot: {0}")]
    Decode(String),
}
