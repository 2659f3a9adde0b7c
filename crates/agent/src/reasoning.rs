//! The optional reasoning step: observation + ordered action plan.
//!
//! The plan is requested before the main request and must validate like any
//! other shape. An empty plan is a violation (`action_plan` has a minimum of
//! one item), not a signal that nothing needs doing.

use schemagent_core::error::Error;
use schemagent_core::provider::ResponseFormat;
use schemagent_core::schema::{FieldSpec, FieldType, Schema, SchemaRegistry};
use schemagent_core::message::Turn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const REASONING_SCHEMA: &str = "reasoning_plan";

/// Appended to the system prompt for the reasoning request only.
pub const REASONING_INSTRUCTIONS: &str = "# CURRENT TASK\n\
Do not answer yet. Describe what you observe about the user's latest message \
and list, in order, the steps you will take to respond.";

pub fn reasoning_schema() -> Schema {
    Schema::new(REASONING_SCHEMA, "What the assistant observes and plans to do next")
        .field(
            FieldSpec::required("observation", FieldType::String)
                .describe("What the latest user message asks for and what is already known"),
        )
        .field(
            FieldSpec::required("action_plan", FieldType::array(FieldType::String))
                .min_items(1)
                .describe("Ordered steps to produce the response"),
        )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningPlan {
    pub observation: String,
    pub action_plan: Vec<String>,
}

impl ReasoningPlan {
    /// Validate raw data against the reasoning shape and decode it.
    pub fn validate(schemas: &SchemaRegistry, raw: &Value) -> Result<Self, Error> {
        let validated = schemas.validate(REASONING_SCHEMA, raw)?;
        Ok(serde_json::from_value(validated)?)
    }

    pub fn format(schemas: &SchemaRegistry) -> Result<ResponseFormat, Error> {
        Ok(ResponseFormat {
            name: REASONING_SCHEMA.into(),
            schema: schemas.json_schema(REASONING_SCHEMA)?,
        })
    }

    /// The synthetic assistant turn recorded for this plan.
    pub fn summary(&self) -> String {
        let steps = self
            .action_plan
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {step}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Observation: {}\nPlan:\n{steps}", self.observation)
    }

    pub fn to_turn(&self) -> Turn {
        Turn::assistant(self.summary())
    }
}
