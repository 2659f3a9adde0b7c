pub mod chat;
pub mod onboard;
pub mod prompt;
pub mod schemas;

use schemagent_agent::{PromptAssembler, ToolListContext, standard_schemas};
use schemagent_config::AppConfig;
use schemagent_core::schema::SchemaRegistry;
use schemagent_core::tool::ToolRegistry;
use std::sync::Arc;

/// The read-only collaborators every command builds from config.
pub struct Runtime {
    pub config: AppConfig,
    pub tools: Arc<ToolRegistry>,
    pub schemas: Arc<SchemaRegistry>,
}

impl Runtime {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        let tools = schemagent_tools::default_registry()?;
        let schemas = standard_schemas(&tools)?;
        Ok(Self {
            config,
            tools: Arc::new(tools),
            schemas: Arc::new(schemas),
        })
    }

    /// Prompt template from `[prompt]` plus the live tool list.
    pub fn assembler(&self) -> Result<PromptAssembler, Box<dyn std::error::Error>> {
        Ok(PromptAssembler::from_config(&self.config.prompt)
            .with_provider(Box::new(ToolListContext::new(Arc::clone(&self.tools))))?)
    }
}
