//! Brief generation runtime.
//!
//! A run is a constrained ReAct loop over five read-only tools:
//! 1. **Prompting** (`prompt`, `react`) - render the transcript, parse each model turn
//! 2. **Guardrails** (`guardrails`) - resolve the client first, stop early once enough is known
//! 3. **Tool execution** (`tools`, `normalize`, `ledger`) - typed arguments, call-once per run
//! 4. **Fallback** (`fallback`) - deterministic brief when the loop ends without an answer
//!
//! `BriefService` ties these together and always returns text, never an error.

pub mod fallback;
pub mod guardrails;
pub mod ledger;
pub mod llm;
pub mod normalize;
pub mod prompt;
pub mod react;
pub mod runtime;
pub mod service;
pub mod tools;

pub use fallback::FallbackSynthesizer;
pub use guardrails::{GuardrailDecision, GuardrailPolicy, ProfileState, RunProgress};
pub use ledger::{ToolCallLedger, ALREADY_CALLED_OBSERVATION};
pub use llm::{LlmClient, LlmError, OpenAiCompatibleClient};
pub use normalize::{ActionInput, CallArgs, ToolDefaults};
pub use prompt::{BriefKind, PromptBuilder, PromptError};
pub use react::{parse_step, AgentStep, ParsedTurn, ReactParseError};
pub use runtime::{BriefRequest, Orchestrator, RunBudget, RunContext, RunOutcome, StopReason};
pub use service::{BriefReport, BriefService, BriefSource};
pub use tools::{ToolName, ToolRegistry, NOT_FOUND_OBSERVATION};
