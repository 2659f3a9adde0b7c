//! Context providers: pluggable renderers of dynamic prompt fragments.
//!
//! A provider is invoked once per prompt assembly and must only *read*
//! whatever it renders from. It holds no state of its own beyond the
//! handles it was constructed with.

use schemagent_core::tool::ToolRegistry;
use std::sync::Arc;

/// A named, pluggable unit that renders one section of the system prompt.
pub trait ContextProvider: Send + Sync {
    /// Unique key within one prompt configuration.
    fn id(&self) -> &str;

    /// Section heading the rendered text appears under.
    fn title(&self) -> &str;

    /// Render the current text for this section.
    fn render(&self) -> String;
}

// ── Static text ───────────────────────────────────────────────────────────

/// A provider whose text never changes.
pub struct StaticContext {
    id: String,
    title: String,
    body: String,
}

impl StaticContext {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

impl ContextProvider for StaticContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn render(&self) -> String {
        self.body.clone()
    }
}

// ── Live tool list ────────────────────────────────────────────────────────

/// Lists the tools of a registry in registration order, with the shape
/// a response must take to select each one.
pub struct ToolListContext {
    tools: Arc<ToolRegistry>,
}

impl ToolListContext {
    pub const ID: &'static str = "available_tools";

    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

impl ContextProvider for ToolListContext {
    fn id(&self) -> &str {
        Self::ID
    }

    fn title(&self) -> &str {
        "Available Tools"
    }

    fn render(&self) -> String {
        if self.tools.is_empty() {
            return "No tools are available; always reply directly.".into();
        }
        self.tools
            .definitions()
            .iter()
            .map(|def| {
                format!(
                    "- {}: {} (select with shape `{}`; returns `{}`)",
                    def.name, def.description, def.input_schema, def.output_schema
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ── Closure-backed ────────────────────────────────────────────────────────

type RenderFn = dyn Fn() -> String + Send + Sync;

/// A provider backed by a closure, for state owned elsewhere
/// (a clock, a user profile, a shared scratchpad).
pub struct FnContext {
    id: String,
    title: String,
    render: Box<RenderFn>,
}

impl FnContext {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        render: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            render: Box::new(render),
        }
    }
}

impl ContextProvider for FnContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn render(&self) -> String {
        (self.render)()
    }
}

impl std::fmt::Debug for FnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnContext")
            .field("id", &self.id)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use schemagent_core::error::ToolError;
    use schemagent_core::schema::Schema;
    use schemagent_core::tool::Tool;
    use serde_json::Value;
    use std::sync::Mutex;

    struct Stub(&'static str);

    #[async_trait]
    impl Tool for Stub {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "does a thing"
        }
        fn input_schema(&self) -> Schema {
            Schema::new(format!("{}_input", self.0), "")
        }
        fn output_schema(&self) -> Schema {
            Schema::new(format!("{}_output", self.0), "")
        }
        async fn execute(&self, input: Value) -> Result<Value, ToolError> {
            Ok(input)
        }
    }

    #[test]
    fn static_context_renders_body() {
        let ctx = StaticContext::new("rules", "Rules", "Be brief.");
        assert_eq!(ctx.id(), "rules");
        assert_eq!(ctx.title(), "Rules");
        assert_eq!(ctx.render(), "Be brief.");
    }

    #[test]
    fn tool_list_in_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Stub("zeta"))).unwrap();
        registry.register(Box::new(Stub("alpha"))).unwrap();
        let ctx = ToolListContext::new(Arc::new(registry));

        let text = ctx.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("- zeta: does a thing"));
        assert!(lines[0].contains("`zeta_input`"));
        assert!(lines[1].starts_with("- alpha:"));
    }

    #[test]
    fn empty_tool_list() {
        let ctx = ToolListContext::new(Arc::new(ToolRegistry::new()));
        assert!(ctx.render().contains("No tools"));
    }

    #[test]
    fn fn_context_reads_live_state() {
        let notes = Arc::new(Mutex::new(vec!["first".to_string()]));
        let reader = Arc::clone(&notes);
        let ctx = FnContext::new("notes", "Notes", move || reader.lock().unwrap().join("; "));

        assert_eq!(ctx.render(), "first");
        notes.lock().unwrap().push("second".into());
        assert_eq!(ctx.render(), "first; second");
    }
}
