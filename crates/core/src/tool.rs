//! Tool trait: the abstraction over typed agent capabilities.
//!
//! A tool is a named unit of functionality with a declared input shape and
//! output shape. The orchestrator only ever sees those shapes and the
//! success/failure of [`Tool::execute`]; what a tool does internally
//! (network, filesystem, arithmetic) is its own business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use crate::error::{SchemaError, ToolError};
use crate::provider::ToolDefinition;
use crate::schema::{Schema, SchemaRegistry};

/// A request to run a tool, as selected by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool to execute
    pub tool: String,

    /// Arguments, already validated against the tool's input shape
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }

    /// The record written to conversation memory for this invocation.
    pub fn to_record(&self) -> String {
        serde_json::json!({ "tool": self.tool, "arguments": self.arguments }).to_string()
    }
}

/// The core Tool trait.
///
/// Tools are constructed once at startup and never mutated afterwards;
/// `execute` takes `&self`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator", "search").
    fn name(&self) -> &str;

    /// A description of what this tool does (echoed into the system prompt).
    fn description(&self) -> &str;

    /// The shape `execute` accepts. Its name doubles as the response-union
    /// member that selects this tool.
    fn input_schema(&self) -> Schema;

    /// The shape `execute` returns.
    fn output_schema(&self) -> Schema;

    /// Nested schemas referenced by the input or output shape.
    fn supporting_schemas(&self) -> Vec<Schema> {
        Vec::new()
    }

    /// Execute the tool with input that has already passed `input_schema`.
    async fn execute(&self, input: Value) -> std::result::Result<Value, ToolError>;

    /// Convert this tool into a ToolDefinition for prompts and providers.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema().name,
            output_schema: self.output_schema().name,
        }
    }
}

/// A registry of available tools.
///
/// Names are unique and listing follows registration order, so anything
/// rendered from the registry (e.g. the tool list in a system prompt) is
/// reproducible.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. A second tool with the same name is rejected.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Find the tool whose input shape is `schema`.
    pub fn by_input_schema(&self, schema: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.input_schema().name == schema)
            .map(|t| t.as_ref())
    }

    /// Tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Register every tool's schemas into `schemas`.
    ///
    /// Tools may share supporting schemas as long as the definitions agree.
    pub fn install_schemas(&self, schemas: &mut SchemaRegistry) -> std::result::Result<(), SchemaError> {
        for tool in &self.tools {
            for schema in tool.supporting_schemas() {
                schemas.register_or_match(schema)?;
            }
            schemas.register_or_match(tool.input_schema())?;
            schemas.register_or_match(tool.output_schema())?;
        }
        Ok(())
    }

    /// Validate input, run the tool, validate its output.
    pub async fn invoke(
        &self,
        name: &str,
        input: &Value,
        schemas: &SchemaRegistry,
    ) -> std::result::Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let input = schemas
            .validate(&tool.input_schema().name, input)
            .map_err(|source| ToolError::InvalidInput {
                tool_name: name.to_string(),
                source,
            })?;

        let output = tool.execute(input).await?;

        schemas
            .validate(&tool.output_schema().name, &output)
            .map_err(|source| ToolError::InvalidOutput {
                tool_name: name.to_string(),
                source,
            })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn input_schema(&self) -> Schema {
            Schema::new("echo_input", "Text to echo")
                .field(FieldSpec::required("text", FieldType::String))
        }
        fn output_schema(&self) -> Schema {
            Schema::new("echo_output", "The echoed text")
                .field(FieldSpec::required("text", FieldType::String))
        }
        async fn execute(&self, input: Value) -> std::result::Result<Value, ToolError> {
            if input["text"] == "boom" {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "echo".into(),
                    reason: "exploded".into(),
                });
            }
            if input["text"] == "bad" {
                return Ok(serde_json::json!({"text": 42}));
            }
            Ok(input)
        }
    }

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str { self.0 }
        fn description(&self) -> &str { "named" }
        fn input_schema(&self) -> Schema { Schema::new(format!("{}_input", self.0), "") }
        fn output_schema(&self) -> Schema { Schema::new(format!("{}_output", self.0), "") }
        async fn execute(&self, input: Value) -> std::result::Result<Value, ToolError> {
            Ok(input)
        }
    }

    fn registry_with_schemas() -> (ToolRegistry, SchemaRegistry) {
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(EchoTool)).unwrap();
        let mut schemas = SchemaRegistry::new();
        tools.install_schemas(&mut schemas).unwrap();
        (tools, schemas)
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.by_input_schema("echo_input").unwrap().name(), "echo");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NamedTool("search"))).unwrap();
        let err = registry.register(Box::new(NamedTool("search"))).unwrap_err();
        assert_eq!(err, ToolError::Duplicate("search".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn listing_follows_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(Box::new(NamedTool(name))).unwrap();
        }
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        let defs = registry.definitions();
        assert_eq!(defs[0].input_schema, "zeta_input");
    }

    #[test]
    fn install_schemas_registers_inputs_and_outputs() {
        let (_, schemas) = registry_with_schemas();
        assert_eq!(schemas.names(), vec!["echo_input", "echo_output"]);
    }

    #[tokio::test]
    async fn invoke_validates_and_executes() {
        let (tools, schemas) = registry_with_schemas();
        let output = tools
            .invoke("echo", &serde_json::json!({"text": "hello world"}), &schemas)
            .await
            .unwrap();
        assert_eq!(output["text"], "hello world");
    }

    #[tokio::test]
    async fn invoke_rejects_bad_input() {
        let (tools, schemas) = registry_with_schemas();
        let err = tools
            .invoke("echo", &serde_json::json!({"txt": "typo"}), &schemas)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn invoke_surfaces_tool_failure_unchanged() {
        let (tools, schemas) = registry_with_schemas();
        let err = tools
            .invoke("echo", &serde_json::json!({"text": "boom"}), &schemas)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::ExecutionFailed {
                tool_name: "echo".into(),
                reason: "exploded".into()
            }
        );
    }

    #[tokio::test]
    async fn invoke_checks_output_shape() {
        let (tools, schemas) = registry_with_schemas();
        let err = tools
            .invoke("echo", &serde_json::json!({"text": "bad"}), &schemas)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidOutput { .. }));
    }

    #[tokio::test]
    async fn invoke_missing_tool() {
        let (tools, schemas) = registry_with_schemas();
        let err = tools
            .invoke("nonexistent", &serde_json::json!({}), &schemas)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn invocation_record_is_json() {
        let inv = ToolInvocation::new("calculator", serde_json::json!({"expression": "2+2"}));
        let parsed: Value = serde_json::from_str(&inv.to_record()).unwrap();
        assert_eq!(parsed["tool"], "calculator");
        assert_eq!(parsed["arguments"]["expression"], "2+2");
    }
}
