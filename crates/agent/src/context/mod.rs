//! Dynamic system prompt construction.
//!
//! [`ContextProvider`]s render live fragments (the tool list, caller state);
//! the [`PromptAssembler`] splices them between the static background,
//! step and output-instruction sections.

pub mod prompt;
pub mod provider;

pub use prompt::{AssemblerError, PromptAssembler};
pub use provider::{ContextProvider, FnContext, StaticContext, ToolListContext};
