//! The orchestrator session: one conversation driven turn by turn.
//!
//! Each call to [`AgentSession::run_turn`] walks the state machine
//!
//! ```text
//! Idle → PromptReady → (Reasoning) → RequestPending → Validated → Dispatched → Idle
//! ```
//!
//! Turns are staged locally and appended to memory in a single atomic
//! commit at the end. A turn that fails, times out or is dropped mid-request
//! leaves memory exactly as it was and the state back at `Idle`.
//!
//! `run_turn` takes `&mut self`, so turns within one session are serialized
//! by the borrow checker. Independent sessions can share the schema and
//! tool registries through `Arc`s; neither is mutated after construction.

use crate::context::PromptAssembler;
use crate::reasoning::{REASONING_INSTRUCTIONS, REASONING_SCHEMA, ReasoningPlan};
use crate::union::{REPLY_SCHEMA, ResponseUnion, ValidatedResponse};
use chrono::Utc;
use schemagent_config::{AgentSettings, DispatchMode};
use schemagent_core::error::{Error, RequestError, Result, ToolError};
use schemagent_core::event::{DomainEvent, EventBus};
use schemagent_core::memory::ConversationMemory;
use schemagent_core::message::{Role, SessionId, Turn};
use schemagent_core::provider::ResponseFormat;
use schemagent_core::schema::SchemaRegistry;
use schemagent_core::structured::StructuredRequester;
use schemagent_core::tool::{ToolInvocation, ToolRegistry};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ── Types ─────────────────────────────────────────────────────────────────

/// Where a session is within the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    PromptReady,
    Reasoning,
    RequestPending,
    Validated,
    Dispatched,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PromptReady => "prompt_ready",
            Self::Reasoning => "reasoning",
            Self::RequestPending => "request_pending",
            Self::Validated => "validated",
            Self::Dispatched => "dispatched",
        };
        f.write_str(name)
    }
}

/// What happens when the model selects a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolDispatch {
    /// Return the validated invocation; the caller decides whether to run it.
    #[default]
    Surface,
    /// Run the tool within the turn and record its outcome.
    Execute,
}

impl From<DispatchMode> for ToolDispatch {
    fn from(mode: DispatchMode) -> Self {
        match mode {
            DispatchMode::Surface => Self::Surface,
            DispatchMode::Execute => Self::Execute,
        }
    }
}

/// The user-visible result of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The plain-reply shape matched.
    Reply(String),
    /// A tool was selected and surfaced to the caller unexecuted.
    ToolSelected(ToolInvocation),
    /// A tool was selected and run. A failed run is still a completed turn.
    ToolExecuted {
        invocation: ToolInvocation,
        result: std::result::Result<Value, ToolError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    pub outcome: TurnOutcome,
    /// The union member the main response matched.
    pub shape: String,
    /// The reasoning plan, when reasoning is enabled.
    pub plan: Option<ReasoningPlan>,
    /// Number of turns committed to memory.
    pub appended: usize,
}

impl TurnResult {
    /// The reply text, if the turn ended in a plain reply.
    pub fn reply(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Reply(text) => Some(text),
            _ => None,
        }
    }
}

/// Per-session policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    pub reasoning: bool,
    pub dispatch: ToolDispatch,
    pub timeout: Option<Duration>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            reasoning: false,
            dispatch: ToolDispatch::Surface,
            timeout: None,
        }
    }
}

impl From<&AgentSettings> for SessionPolicy {
    fn from(settings: &AgentSettings) -> Self {
        Self {
            reasoning: settings.reasoning,
            dispatch: settings.tool_dispatch.into(),
            timeout: Some(Duration::from_secs(settings.request_timeout_secs)),
        }
    }
}

/// The memory record for a tool's outcome, written as a system turn.
pub fn tool_outcome_record(
    invocation: &ToolInvocation,
    result: &std::result::Result<Value, ToolError>,
) -> String {
    match result {
        Ok(output) => serde_json::json!({
            "tool": invocation.tool,
            "ok": true,
            "output": output,
        }),
        Err(e) => serde_json::json!({
            "tool": invocation.tool,
            "ok": false,
            "error": e.to_string(),
        }),
    }
    .to_string()
}

// ── State guard ───────────────────────────────────────────────────────────

/// Tracks the turn state and resets it to `Idle` when dropped, whether the
/// turn finished, failed, or its future was dropped mid-await.
struct StateGuard {
    state: Arc<Mutex<TurnState>>,
}

impl StateGuard {
    fn enter(state: &Arc<Mutex<TurnState>>) -> Self {
        let guard = Self {
            state: Arc::clone(state),
        };
        guard.set(TurnState::Idle);
        guard
    }

    fn set(&self, next: TurnState) {
        if let Ok(mut state) = self.state.lock() {
            debug!(from = %*state, to = %next, "Turn state transition");
            *state = next;
        }
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            *state = TurnState::Idle;
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────

/// One conversation: memory, prompt configuration, response union and the
/// collaborators a turn needs.
pub struct AgentSession {
    id: SessionId,
    memory: ConversationMemory,
    assembler: PromptAssembler,
    schemas: Arc<SchemaRegistry>,
    tools: Arc<ToolRegistry>,
    union: ResponseUnion,
    requester: Arc<dyn StructuredRequester>,
    events: Arc<EventBus>,
    policy: SessionPolicy,
    state: Arc<Mutex<TurnState>>,
}

impl AgentSession {
    pub fn builder(
        requester: Arc<dyn StructuredRequester>,
        schemas: Arc<SchemaRegistry>,
        tools: Arc<ToolRegistry>,
    ) -> AgentSessionBuilder {
        AgentSessionBuilder {
            id: None,
            memory: ConversationMemory::new(),
            assembler: None,
            schemas,
            tools,
            union: None,
            requester,
            events: None,
            policy: SessionPolicy::default(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> TurnState {
        self.state.lock().map(|s| *s).unwrap_or(TurnState::Idle)
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Mutable access for explicit reset, reload and windowing between turns.
    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    pub fn assembler_mut(&mut self) -> &mut PromptAssembler {
        &mut self.assembler
    }

    pub fn union(&self) -> &ResponseUnion {
        &self.union
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The system prompt as the next turn would see it.
    pub fn system_prompt(&self) -> String {
        self.assembler.generate()
    }

    /// Run one user turn to completion.
    pub async fn run_turn(&mut self, input: &str) -> Result<TurnResult> {
        let guard = StateGuard::enter(&self.state);
        info!(session_id = %self.id, history = self.memory.len(), "Turn started");
        self.publish(DomainEvent::TurnStarted {
            session_id: self.id.to_string(),
            history_len: self.memory.len(),
            timestamp: Utc::now(),
        });

        let result = self.drive_turn(input, &guard).await;

        if let Err(e) = &result {
            warn!(session_id = %self.id, error = %e, "Turn aborted; memory unchanged");
            self.publish(DomainEvent::TurnAborted {
                session_id: self.id.to_string(),
                reason: e.to_string(),
                timestamp: Utc::now(),
            });
        }
        result
    }

    async fn drive_turn(&mut self, input: &str, guard: &StateGuard) -> Result<TurnResult> {
        let mut staged = vec![Turn::user(input)];

        // Idle → PromptReady: regenerated every turn, never cached.
        let prompt = self.assembler.generate();
        guard.set(TurnState::PromptReady);
        self.publish(DomainEvent::PromptAssembled {
            session_id: self.id.to_string(),
            providers: self.assembler.provider_count(),
            prompt_bytes: prompt.len(),
            timestamp: Utc::now(),
        });

        // PromptReady → Reasoning
        let plan = if self.policy.reasoning {
            guard.set(TurnState::Reasoning);
            let plan = self.reason(&prompt, &staged).await?;
            staged.push(plan.to_turn());
            Some(plan)
        } else {
            None
        };

        // → RequestPending
        guard.set(TurnState::RequestPending);
        let format = self.union.format(&self.schemas)?;
        let raw = self.request(&prompt, &staged, &format).await?;

        // RequestPending → Validated
        let (member, response) = self.union.resolve(&self.schemas, &raw)?;
        let shape = member.shape.clone();
        guard.set(TurnState::Validated);
        self.publish(DomainEvent::ResponseValidated {
            session_id: self.id.to_string(),
            shape: shape.clone(),
            timestamp: Utc::now(),
        });

        // Validated → Dispatched
        let outcome = match response {
            ValidatedResponse::Reply { content } => {
                staged.push(Turn::assistant(content.clone()));
                TurnOutcome::Reply(content)
            }
            ValidatedResponse::Tool(invocation) => {
                staged.push(Turn::assistant(invocation.to_record()));
                match self.policy.dispatch {
                    ToolDispatch::Surface => TurnOutcome::ToolSelected(invocation),
                    ToolDispatch::Execute => {
                        let result = self.execute_tool(&invocation).await;
                        staged.push(Turn::system(tool_outcome_record(&invocation, &result)));
                        TurnOutcome::ToolExecuted { invocation, result }
                    }
                }
            }
        };
        guard.set(TurnState::Dispatched);

        // Dispatched → Idle: the only write to memory in a turn.
        let appended = staged.len();
        self.memory.append_all(staged);
        info!(session_id = %self.id, shape = %shape, appended, "Turn committed");
        self.publish(DomainEvent::TurnCommitted {
            session_id: self.id.to_string(),
            appended,
            timestamp: Utc::now(),
        });

        Ok(TurnResult {
            outcome,
            shape,
            plan,
            appended,
        })
    }

    async fn reason(&self, prompt: &str, staged: &[Turn]) -> Result<ReasoningPlan> {
        let format = ReasoningPlan::format(&self.schemas)?;
        let reasoning_prompt = format!("{prompt}\n\n{REASONING_INSTRUCTIONS}");
        let raw = self.request(&reasoning_prompt, staged, &format).await?;
        let plan = ReasoningPlan::validate(&self.schemas, &raw)?;
        debug!(session_id = %self.id, steps = plan.action_plan.len(), "Reasoning plan accepted");
        self.publish(DomainEvent::ReasoningCompleted {
            session_id: self.id.to_string(),
            steps: plan.action_plan.len(),
            timestamp: Utc::now(),
        });
        Ok(plan)
    }

    /// Issue one structured request against memory plus the staged turns.
    async fn request(
        &self,
        prompt: &str,
        staged: &[Turn],
        format: &ResponseFormat,
    ) -> std::result::Result<Value, RequestError> {
        let mut transcript = self.memory.history();
        transcript.extend_from_slice(staged);

        debug!(
            session_id = %self.id,
            requester = self.requester.name(),
            shape = %format.name,
            turns = transcript.len(),
            "Structured request pending"
        );
        let pending = self.requester.request(prompt, &transcript, format);
        match self.policy.timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| RequestError::Timeout { limit })?,
            None => pending.await,
        }
    }

    /// Validate and run a surfaced tool invocation.
    ///
    /// The outcome is returned as a value; recording it is up to the caller
    /// (see [`record_tool_outcome`](Self::record_tool_outcome)).
    pub async fn execute_tool(
        &self,
        invocation: &ToolInvocation,
    ) -> std::result::Result<Value, ToolError> {
        let started = Instant::now();
        let result = self
            .tools
            .invoke(&invocation.tool, &invocation.arguments, &self.schemas)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(tool = %invocation.tool, duration_ms, "Tool executed"),
            Err(e) => warn!(tool = %invocation.tool, error = %e, "Tool failed"),
        }
        self.publish(DomainEvent::ToolExecuted {
            tool_name: invocation.tool.clone(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }

    /// Append a tool outcome to memory as a system turn.
    pub fn record_tool_outcome(
        &mut self,
        invocation: &ToolInvocation,
        result: &std::result::Result<Value, ToolError>,
    ) {
        self.memory
            .append(Role::System, tool_outcome_record(invocation, result));
    }

    fn publish(&self, event: DomainEvent) {
        self.events.publish(event);
    }
}

// ── Builder ───────────────────────────────────────────────────────────────

pub struct AgentSessionBuilder {
    id: Option<SessionId>,
    memory: ConversationMemory,
    assembler: Option<PromptAssembler>,
    schemas: Arc<SchemaRegistry>,
    tools: Arc<ToolRegistry>,
    union: Option<ResponseUnion>,
    requester: Arc<dyn StructuredRequester>,
    events: Option<Arc<EventBus>>,
    policy: SessionPolicy,
}

impl AgentSessionBuilder {
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Start from a seeded transcript instead of empty memory.
    pub fn with_memory(mut self, memory: ConversationMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = Some(assembler);
        self
    }

    /// Override the default union (reply, then every tool in registration order).
    pub fn with_union(mut self, union: ResponseUnion) -> Self {
        self.union = Some(union);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reasoning(mut self, enabled: bool) -> Self {
        self.policy.reasoning = enabled;
        self
    }

    pub fn with_dispatch(mut self, dispatch: ToolDispatch) -> Self {
        self.policy.dispatch = dispatch;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = Some(timeout);
        self
    }

    /// Build the session, failing fast on any shape or tool the union,
    /// reasoning step or tool registry refers to but the registry lacks.
    pub fn build(self) -> Result<AgentSession> {
        let union = self
            .union
            .unwrap_or_else(|| ResponseUnion::for_tools(REPLY_SCHEMA, &self.tools));
        union.check(&self.schemas, &self.tools)?;

        if self.policy.reasoning {
            self.schemas.require(REASONING_SCHEMA)?;
        }
        for def in self.tools.definitions() {
            self.schemas.require(&def.input_schema)?;
            self.schemas.require(&def.output_schema)?;
        }
        if self.policy.timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".into(),
            });
        }

        let id = self.id.unwrap_or_default();
        debug!(
            session_id = %id,
            shapes = ?union.shape_names(),
            reasoning = self.policy.reasoning,
            dispatch = ?self.policy.dispatch,
            "Session built"
        );

        Ok(AgentSession {
            id,
            memory: self.memory,
            assembler: self.assembler.unwrap_or_default(),
            schemas: self.schemas,
            tools: self.tools,
            union,
            requester: self.requester,
            events: self.events.unwrap_or_default(),
            policy: self.policy,
            state: Arc::new(Mutex::new(TurnState::Idle)),
        })
    }
}
