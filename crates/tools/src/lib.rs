//! Built-in tool implementations for schemagent.
//!
//! Each tool declares a typed input and output shape; the orchestrator
//! treats a tool's input schema as the invocation record a model may emit.

pub mod calculator;
pub mod search;

use schemagent_core::error::ToolError;
use schemagent_core::tool::ToolRegistry;

/// Create a registry holding every built-in tool, in a fixed order.
pub fn default_registry() -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(calculator::CalculatorTool))?;
    registry.register(Box::new(search::SearchTool))?;
    Ok(registry)
}
