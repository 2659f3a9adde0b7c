//! The schemagent orchestration core.
//!
//! An [`AgentSession`] drives one conversation turn by turn:
//!
//! 1. **Assemble** the system prompt from static sections and live
//!    [`ContextProvider`]s
//! 2. **Reason** (optional): request an observation + action plan
//! 3. **Request** one structured response constrained to the
//!    [`ResponseUnion`] (plain reply ∪ tool invocation shapes)
//! 4. **Validate** it against the schema registry; first declared match wins
//! 5. **Dispatch**: surface the reply or tool invocation, or run the tool
//!    when the session's policy says so
//! 6. **Commit** the staged turns to memory in one atomic append
//!
//! Any failure before the commit leaves memory untouched.

pub mod context;
pub mod orchestrator;
pub mod reasoning;
pub mod requester;
pub mod union;

#[cfg(test)]
mod test_helpers;

pub use context::{
    AssemblerError, ContextProvider, FnContext, PromptAssembler, StaticContext, ToolListContext,
};
pub use orchestrator::{
    AgentSession, AgentSessionBuilder, SessionPolicy, ToolDispatch, TurnOutcome, TurnResult,
    TurnState, tool_outcome_record,
};
pub use reasoning::{REASONING_SCHEMA, ReasoningPlan, reasoning_schema};
pub use requester::{ProviderRequester, parse_payload};
pub use union::{
    MemberKind, REPLY_SCHEMA, ResponseUnion, UnionMember, ValidatedResponse, reply_schema,
    standard_schemas,
};
