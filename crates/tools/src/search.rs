//! Search tool: deterministic offline stub.
//!
//! Returns results from a small built-in corpus ranked by keyword overlap,
//! so the orchestrator can be driven end-to-end without network access.

use async_trait::async_trait;
use schemagent_core::error::ToolError;
use schemagent_core::schema::{FieldSpec, FieldType, Schema};
use schemagent_core::tool::Tool;
use serde::Serialize;
use serde_json::Value;

pub const INPUT_SCHEMA: &str = "search_input";
pub const OUTPUT_SCHEMA: &str = "search_output";
pub const RESULT_SCHEMA: &str = "search_result";

const DEFAULT_RESULTS: usize = 3;
const MAX_RESULTS: usize = 5;

pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for reference material. Returns titles, URLs and snippets."
    }

    fn input_schema(&self) -> Schema {
        Schema::new(INPUT_SCHEMA, "Select the search tool and give it a query")
            .field(FieldSpec::required("query", FieldType::String).describe("The search query"))
            .field(
                FieldSpec::optional("num_results", FieldType::Integer)
                    .coercible()
                    .describe("Number of results to return (default 3, max 5)"),
            )
            .strict()
    }

    fn output_schema(&self) -> Schema {
        Schema::new(OUTPUT_SCHEMA, "Search results, best match first").field(FieldSpec::required(
            "results",
            FieldType::array(FieldType::object(RESULT_SCHEMA)),
        ))
    }

    fn supporting_schemas(&self) -> Vec<Schema> {
        vec![
            Schema::new(RESULT_SCHEMA, "A single search hit")
                .field(FieldSpec::required("title", FieldType::String))
                .field(FieldSpec::required("url", FieldType::String))
                .field(FieldSpec::required("snippet", FieldType::String)),
        ]
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let query = input["query"].as_str().unwrap_or_default().trim();
        if query.is_empty() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "search".into(),
                reason: "query is empty".into(),
            });
        }
        let limit = input["num_results"]
            .as_u64()
            .map_or(DEFAULT_RESULTS, |n| n as usize)
            .clamp(1, MAX_RESULTS);

        let results = rank(query, limit);
        tracing::debug!(query, hits = results.len(), "search stub answered");
        Ok(serde_json::json!({ "results": results }))
    }
}

#[derive(Debug, Clone, Serialize)]
struct Hit {
    title: &'static str,
    url: &'static str,
    snippet: &'static str,
}

const CORPUS: &[Hit] = &[
    Hit {
        title: "The Rust Programming Language",
        url: "https://doc.rust-lang.org/book/",
        snippet: "Rust is a systems programming language focused on safety, speed and concurrency.",
    },
    Hit {
        title: "Tokio: an asynchronous Rust runtime",
        url: "https://tokio.rs/",
        snippet: "Tokio is an event-driven, non-blocking I/O platform for writing asynchronous applications with Rust.",
    },
    Hit {
        title: "JSON Schema reference",
        url: "https://json-schema.org/understanding-json-schema/",
        snippet: "JSON Schema is a vocabulary that allows you to annotate and validate JSON documents.",
    },
    Hit {
        title: "Structured outputs for language models",
        url: "https://platform.openai.com/docs/guides/structured-outputs",
        snippet: "Structured outputs make a model's response adhere to a supplied JSON schema.",
    },
    Hit {
        title: "Speed of light",
        url: "https://en.wikipedia.org/wiki/Speed_of_light",
        snippet: "The speed of light in vacuum is exactly 299,792,458 metres per second.",
    },
    Hit {
        title: "Paris",
        url: "https://en.wikipedia.org/wiki/Paris",
        snippet: "Paris is the capital and largest city of France.",
    },
];

fn score(hit: &Hit, terms: &[String]) -> usize {
    let haystack = format!("{} {}", hit.title, hit.snippet).to_lowercase();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

fn rank(query: &str, limit: usize) -> Vec<Hit> {
    let terms: Vec<String> = query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect();

    let mut scored: Vec<(usize, &Hit)> = CORPUS
        .iter()
        .map(|hit| (score(hit, &terms), hit))
        .filter(|(s, _)| *s > 0)
        .collect();
    // Stable sort keeps corpus order among equal scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, hit)| hit.clone()).collect()
}
