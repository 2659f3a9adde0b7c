//! System prompt assembly.
//!
//! The assembled prompt is a pure function of the static template and the
//! current output of every registered [`ContextProvider`]. Sections appear
//! in a fixed order:
//!
//! 1. `# IDENTITY AND PURPOSE` (background lines)
//! 2. `# INTERNAL ASSISTANT STEPS` (numbered steps)
//! 3. one `# <TITLE>` section per context provider, in registration order
//! 4. `# OUTPUT INSTRUCTIONS`
//!
//! No timestamps, hashing or map iteration is involved, so two calls with
//! no intervening state change return byte-identical strings.

use super::provider::ContextProvider;
use schemagent_config::PromptConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("Context provider already registered: {0}")]
    DuplicateProvider(String),
}

/// Composes the static template with live context provider output.
pub struct PromptAssembler {
    background: Vec<String>,
    steps: Vec<String>,
    output_instructions: Vec<String>,
    providers: Vec<Box<dyn ContextProvider>>,
}

impl PromptAssembler {
    pub fn new(
        background: Vec<String>,
        steps: Vec<String>,
        output_instructions: Vec<String>,
    ) -> Self {
        Self {
            background,
            steps,
            output_instructions,
            providers: Vec::new(),
        }
    }

    /// Build the static template from the `[prompt]` config section.
    pub fn from_config(config: &PromptConfig) -> Self {
        Self::new(
            config.background.clone(),
            config.steps.clone(),
            config.output_instructions.clone(),
        )
    }

    /// Register a provider at the end of the section list.
    pub fn register(&mut self, provider: Box<dyn ContextProvider>) -> Result<(), AssemblerError> {
        if self.get(provider.id()).is_some() {
            return Err(AssemblerError::DuplicateProvider(provider.id().to_string()));
        }
        tracing::debug!(provider = provider.id(), "Registered context provider");
        self.providers.push(provider);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_provider(
        mut self,
        provider: Box<dyn ContextProvider>,
    ) -> Result<Self, AssemblerError> {
        self.register(provider)?;
        Ok(self)
    }

    /// Remove a provider, returning it if it was registered.
    pub fn unregister(&mut self, id: &str) -> Option<Box<dyn ContextProvider>> {
        let pos = self.providers.iter().position(|p| p.id() == id)?;
        Some(self.providers.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&dyn ContextProvider> {
        self.providers.iter().find(|p| p.id() == id).map(|p| p.as_ref())
    }

    /// Registered provider ids, in section order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Render the full system prompt.
    pub fn generate(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if !self.background.is_empty() {
            sections.push(section(
                "IDENTITY AND PURPOSE",
                &self.background.join("\n"),
            ));
        }

        if !self.steps.is_empty() {
            let numbered = self
                .steps
                .iter()
                .enumerate()
                .map(|(i, step)| format!("{}. {step}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(section("INTERNAL ASSISTANT STEPS", &numbered));
        }

        for provider in &self.providers {
            let title = provider.title().to_uppercase();
            sections.push(section(&title, provider.render().trim_end()));
        }

        if !self.output_instructions.is_empty() {
            let bullets = self
                .output_instructions
                .iter()
                .map(|line| format!("- {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(section("OUTPUT INSTRUCTIONS", &bullets));
        }

        sections.join("\n\n")
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

fn section(title: &str, body: &str) -> String {
    format!("# {title}\n{body}")
}
