//! `schemagent schemas`: List registered shapes and the default response union.

use super::Runtime;
use schemagent_agent::{MemberKind, REPLY_SCHEMA, ResponseUnion};

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::load()?;
    let schemas = &runtime.schemas;

    println!("Registered shapes ({}):", schemas.len());
    for name in schemas.names() {
        let schema = schemas.require(name)?;
        let strict = if schema.strict { " [strict]" } else { "" };
        println!("  {name}{strict}: {}", schema.description);
        for field in &schema.fields {
            let req = if field.required { "required" } else { "optional" };
            println!("      {}: {} ({req})", field.name, field.ty.label());
        }
    }

    let union = ResponseUnion::for_tools(REPLY_SCHEMA, &runtime.tools);
    println!("\nResponse union (first match wins):");
    for (i, member) in union.members().iter().enumerate() {
        let role = match &member.kind {
            MemberKind::Reply => "plain reply".to_string(),
            MemberKind::Tool { tool_name } => format!("invoke `{tool_name}`"),
        };
        println!("  {}. {} → {role}", i + 1, member.shape);
    }

    if json {
        for name in schemas.names() {
            println!("\n// {name}");
            println!("{}", serde_json::to_string_pretty(&schemas.json_schema(name)?)?);
        }
    }
    Ok(())
}
