//! The response union: the closed set of shapes a main request may return.
//!
//! Members are tried in declaration order and the first one that validates
//! wins, so the order is part of a session's contract. The plain-reply
//! shape is always the first member; tool members follow in the order they
//! were added (for [`ResponseUnion::for_tools`], tool registration order).
//!
//! A tool member's shape is the tool's *input* schema: a response matching
//! it is a request to invoke that tool with the validated data.

use crate::reasoning::reasoning_schema;
use schemagent_core::error::{Error, SchemaError, ToolError};
use schemagent_core::provider::ResponseFormat;
use schemagent_core::schema::{FieldSpec, FieldType, Schema, SchemaRegistry};
use schemagent_core::tool::{ToolInvocation, ToolRegistry};
use serde_json::Value;

/// Name of the built-in plain-reply shape.
pub const REPLY_SCHEMA: &str = "reply";

/// The plain-reply shape: `{ "content": string }`.
pub fn reply_schema() -> Schema {
    Schema::new(REPLY_SCHEMA, "A direct answer to the user, with no tool involved").field(
        FieldSpec::required("content", FieldType::String)
            .describe("The message shown to the user"),
    )
}

/// A schema registry holding the reply shape, the reasoning shape and every
/// schema the given tools declare.
pub fn standard_schemas(tools: &ToolRegistry) -> Result<SchemaRegistry, SchemaError> {
    let mut schemas = SchemaRegistry::new();
    schemas.register(reply_schema())?;
    schemas.register(reasoning_schema())?;
    tools.install_schemas(&mut schemas)?;
    Ok(schemas)
}

/// What a union member stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Reply,
    Tool { tool_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMember {
    pub shape: String,
    pub kind: MemberKind,
}

/// A response after union resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedResponse {
    /// The plain-reply shape matched.
    Reply { content: String },
    /// A tool member matched; `arguments` are the validated (coerced) data.
    Tool(ToolInvocation),
}

impl ValidatedResponse {
    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseUnion {
    members: Vec<UnionMember>,
}

impl ResponseUnion {
    /// A union holding only the plain-reply shape.
    pub fn new(reply_shape: impl Into<String>) -> Self {
        Self {
            members: vec![UnionMember {
                shape: reply_shape.into(),
                kind: MemberKind::Reply,
            }],
        }
    }

    /// Append a tool member after the existing ones.
    pub fn with_tool(mut self, tool_name: impl Into<String>, shape: impl Into<String>) -> Self {
        self.members.push(UnionMember {
            shape: shape.into(),
            kind: MemberKind::Tool {
                tool_name: tool_name.into(),
            },
        });
        self
    }

    /// Reply first, then every tool's input shape in registration order.
    pub fn for_tools(reply_shape: impl Into<String>, tools: &ToolRegistry) -> Self {
        tools
            .definitions()
            .into_iter()
            .fold(Self::new(reply_shape), |union, def| {
                union.with_tool(def.name, def.input_schema)
            })
    }

    pub fn members(&self) -> &[UnionMember] {
        &self.members
    }

    pub fn shape_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.shape.as_str()).collect()
    }

    /// Fail fast if any member refers to an unregistered shape or tool, or
    /// if a tool member's shape is not that tool's input schema.
    pub fn check(&self, schemas: &SchemaRegistry, tools: &ToolRegistry) -> Result<(), Error> {
        for member in &self.members {
            schemas.require(&member.shape)?;
            if let MemberKind::Tool { tool_name } = &member.kind {
                let tool = tools
                    .get(tool_name)
                    .ok_or_else(|| ToolError::NotFound(tool_name.clone()))?;
                let input = tool.input_schema().name;
                if member.shape != input {
                    return Err(Error::Config {
                        message: format!(
                            "union member `{}` for tool `{tool_name}` must be its input schema `{input}`",
                            member.shape
                        ),
                    });
                }
                schemas.require(&tool.output_schema().name)?;
            }
        }
        Ok(())
    }

    /// Determine which member `raw` matches; first declared match wins.
    ///
    /// Returns the matched member alongside the validated response.
    pub fn resolve(
        &self,
        schemas: &SchemaRegistry,
        raw: &Value,
    ) -> Result<(&UnionMember, ValidatedResponse), Error> {
        let mut diagnostics = Vec::new();
        for member in &self.members {
            match schemas.validate(&member.shape, raw) {
                Ok(validated) => {
                    tracing::debug!(shape = %member.shape, "Response matched union member");
                    let response = match &member.kind {
                        MemberKind::Reply => ValidatedResponse::Reply {
                            content: reply_content(validated),
                        },
                        MemberKind::Tool { tool_name } => {
                            ValidatedResponse::Tool(ToolInvocation::new(tool_name.clone(), validated))
                        }
                    };
                    return Ok((member, response));
                }
                Err(err @ SchemaError::Validation { .. }) => diagnostics.push(err),
                Err(other) => return Err(other.into()),
            }
        }
        Err(Error::ResponseShapeMismatch {
            candidates: self.members.iter().map(|m| m.shape.clone()).collect(),
            diagnostics,
        })
    }

    /// JSON Schema for the whole union: the member itself when there is
    /// only one, otherwise an `anyOf` in member order.
    pub fn json_schema(&self, schemas: &SchemaRegistry) -> Result<Value, SchemaError> {
        match self.shape_names().as_slice() {
            [single] => schemas.json_schema(single),
            names => schemas.json_schema_any_of(names),
        }
    }

    /// The response format handed to the structured requester.
    pub fn format(&self, schemas: &SchemaRegistry) -> Result<ResponseFormat, SchemaError> {
        Ok(ResponseFormat {
            name: self.shape_names().join("|"),
            schema: self.json_schema(schemas)?,
        })
    }
}

/// Reply shapes carry their text in `content`; any other reply shape is
/// surfaced as its JSON rendering.
fn reply_content(validated: Value) -> String {
    match validated.get("content").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => validated.to_string(),
    }
}
