//! The ReAct loop: THINKING (model turn) → ACTING (tool dispatch) → OBSERVING (scratchpad
//! append), repeated until the model or a guardrail reaches FINAL, or the budget runs out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use precall_core::brief::{cap_words, BRIEF_WORD_LIMIT};
use precall_core::config::AgentConfig;
use precall_core::errors::{BriefError, BudgetKind};

use crate::guardrails::{GuardrailDecision, GuardrailPolicy, ProfileState, RunProgress};
use crate::ledger::ToolCallLedger;
use crate::llm::LlmClient;
use crate::normalize::{ActionInput, ToolDefaults};
use crate::prompt::{BriefKind, PromptBuilder, PromptInput};
use crate::react::{parse_forced_final, parse_step, AgentStep, ParsedTurn};
use crate::tools::{DispatchOutcome, ToolName, ToolRegistry};

const PARSE_FAILURE_TOOL: &str = "_Exception";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunBudget {
    pub max_iterations: u32,
    pub max_execution: Duration,
}

impl Default for RunBudget {
    fn default() -> Self {
        Self { max_iterations: 10, max_execution: Duration::from_secs(60) }
    }
}

impl From<&AgentConfig> for RunBudget {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            max_execution: Duration::from_secs(config.max_execution_secs),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BriefRequest {
    pub client_name: String,
    pub kind: BriefKind,
}

impl BriefRequest {
    pub fn new(client_name: impl Into<String>, kind: BriefKind) -> Self {
        Self { client_name: client_name.into().trim().to_string(), kind }
    }
}

/// State owned by exactly one run. Concurrent runs each build their own.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub ledger: ToolCallLedger,
    pub steps: Vec<AgentStep>,
    pub progress: RunProgress,
    pub iterations: u32,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            ledger: ToolCallLedger::new(),
            steps: Vec::new(),
            progress: RunProgress::default(),
            iterations: 0,
        }
    }

    fn begin(&mut self) {
        self.ledger.reset();
        self.steps.clear();
        self.progress = RunProgress::default();
        self.iterations = 0;
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Final,
    EmptyAnswer,
    IterationLimit,
    TimeLimit,
    ModelUnavailable,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Final => "final",
            Self::EmptyAnswer => "empty_answer",
            Self::IterationLimit => "iteration_limit",
            Self::TimeLimit => "time_limit",
            Self::ModelUnavailable => "model_unavailable",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// `None` means the caller must fall back.
    pub answer: Option<String>,
    pub stop_reason: StopReason,
    pub iterations: u32,
    pub tool_calls: usize,
}

pub struct Orchestrator {
    llm: Arc<dyn LlmClient>,
    registry: ToolRegistry,
    prompts: PromptBuilder,
    policy: GuardrailPolicy,
    budget: RunBudget,
    defaults: ToolDefaults,
    enforce_word_cap: bool,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: ToolRegistry,
        prompts: PromptBuilder,
        budget: RunBudget,
        defaults: ToolDefaults,
    ) -> Self {
        Self {
            llm,
            registry,
            prompts,
            policy: GuardrailPolicy::default(),
            budget,
            defaults,
            enforce_word_cap: true,
        }
    }

    pub fn with_policy(mut self, policy: GuardrailPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_word_cap(mut self, enforce: bool) -> Self {
        self.enforce_word_cap = enforce;
        self
    }

    pub fn budget(&self) -> RunBudget {
        self.budget
    }

    pub async fn run(&self, request: &BriefRequest, context: &mut RunContext) -> RunOutcome {
        context.begin();
        info!(
            event_name = "agent.run.started",
            run_id = %context.run_id,
            client_name = %request.client_name,
            kind = ?request.kind,
            max_iterations = self.budget.max_iterations,
            max_execution_ms = self.budget.max_execution.as_millis() as u64,
            "brief run started"
        );

        let started = Instant::now();
        let bounded = tokio::time::timeout(
            self.budget.max_execution,
            self.drive(request, &mut *context, started),
        )
        .await;
        let outcome = match bounded {
            Ok(outcome) => outcome,
            Err(_) => self.exhausted(context, BudgetKind::WallClock),
        };

        info!(
            event_name = "agent.run.finished",
            run_id = %context.run_id,
            stop_reason = outcome.stop_reason.as_str(),
            iterations = outcome.iterations,
            tool_calls = outcome.tool_calls,
            answered = outcome.answer.is_some(),
            "brief run finished"
        );
        outcome
    }

    async fn drive(
        &self,
        request: &BriefRequest,
        context: &mut RunContext,
        started: Instant,
    ) -> RunOutcome {
        let question = request.kind.question(&request.client_name);

        loop {
            if started.elapsed() >= self.budget.max_execution {
                return self.exhausted(context, BudgetKind::WallClock);
            }

            let decision = self.policy.before_turn(&context.progress, &request.client_name);
            if let GuardrailDecision::Redirect { reason_code, tool, input } = decision {
                info!(
                    event_name = "agent.guardrail.redirect",
                    run_id = %context.run_id,
                    reason_code,
                    tool = tool.as_str(),
                    "guardrail selected the next tool"
                );
                let log = action_log("", tool, &input);
                self.act(context, tool.as_str(), &input, String::new(), log).await;
                continue;
            }

            if context.iterations >= self.budget.max_iterations {
                return self.exhausted(context, BudgetKind::Iterations);
            }
            context.iterations += 1;

            if let GuardrailDecision::ForceFinal { reason_code } = decision {
                info!(
                    event_name = "agent.guardrail.force_final",
                    run_id = %context.run_id,
                    reason_code,
                    "guardrail forced the final answer"
                );
                return self.force_final(&question, context).await;
            }

            let Some(completion) = self.think(&question, context, false).await else {
                return self.outcome(context, None, StopReason::ModelUnavailable);
            };

            match parse_step(&completion) {
                Ok(ParsedTurn::Final { answer, .. }) => return self.finish(context, answer),
                Ok(ParsedTurn::Action(action)) => {
                    let requested = ToolName::parse(&action.tool);
                    let review =
                        self.policy.review_action(&context.progress, requested, &request.client_name);
                    match review {
                        GuardrailDecision::Redirect { reason_code, tool, input } => {
                            info!(
                                event_name = "agent.guardrail.redirect",
                                run_id = %context.run_id,
                                reason_code,
                                requested = %action.tool,
                                tool = tool.as_str(),
                                "guardrail replaced the proposed tool"
                            );
                            let log = action_log(&action.thought, tool, &input);
                            self.act(context, tool.as_str(), &input, action.thought, log).await;
                        }
                        GuardrailDecision::Allow | GuardrailDecision::ForceFinal { .. } => {
                            self.act(context, &action.tool, &action.input, action.thought, action.log)
                                .await;
                        }
                    }
                }
                Err(parse_error) => {
                    let error = BriefError::Parse(parse_error.to_string());
                    info!(
                        event_name = "agent.parse.recovery",
                        run_id = %context.run_id,
                        error_class = error.error_class(),
                        error = %error,
                        "sending corrective instruction"
                    );
                    context.steps.push(AgentStep {
                        thought: String::new(),
                        tool: PARSE_FAILURE_TOOL.to_string(),
                        args: None,
                        log: completion.trim().to_string(),
                        observation: parse_error.corrective_instruction(),
                    });
                }
            }
        }
    }

    async fn think(
        &self,
        question: &str,
        context: &RunContext,
        force_final: bool,
    ) -> Option<String> {
        let tools = self.registry.describe();
        let tool_names = self.registry.tool_names();
        let prompt = match self.prompts.render(&PromptInput {
            question,
            tools: &tools,
            tool_names: &tool_names,
            steps: &context.steps,
            force_final,
        }) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(
                    event_name = "agent.prompt.failed",
                    run_id = %context.run_id,
                    error = %error,
                    "prompt render failed"
                );
                return None;
            }
        };

        match self.llm.complete(&prompt).await {
            Ok(completion) => Some(completion),
            Err(error) => {
                warn!(
                    event_name = "agent.llm.failed",
                    run_id = %context.run_id,
                    error = %error,
                    "model call failed"
                );
                None
            }
        }
    }

    async fn force_final(&self, question: &str, context: &mut RunContext) -> RunOutcome {
        match self.think(question, context, true).await {
            Some(completion) => self.finish(context, parse_forced_final(&completion)),
            None => self.outcome(context, None, StopReason::ModelUnavailable),
        }
    }

    async fn act(
        &self,
        context: &mut RunContext,
        tool_name: &str,
        input: &ActionInput,
        thought: String,
        log: String,
    ) {
        let dispatch =
            self.registry.dispatch(&mut context.ledger, tool_name, input, &self.defaults).await;

        match dispatch.outcome {
            DispatchOutcome::Executed(tool) => {
                if tool == ToolName::ClientOverview {
                    context.progress.profile = ProfileState::Resolved;
                }
                context.progress.observed.insert(tool);
            }
            DispatchOutcome::NotFound(tool) => {
                if tool == ToolName::ClientOverview {
                    let error = BriefError::NotFound(input.resolve_client_name());
                    info!(
                        event_name = "agent.client.not_found",
                        run_id = %context.run_id,
                        error_class = error.error_class(),
                        error = %error,
                        "switching to notes-only branch"
                    );
                    context.progress.profile = ProfileState::NotFound;
                }
                context.progress.observed.insert(tool);
            }
            DispatchOutcome::Failed(tool) => {
                warn!(
                    event_name = "agent.tool.failed",
                    run_id = %context.run_id,
                    tool = tool.as_str(),
                    observation = %dispatch.observation,
                    "tool call failed"
                );
                context.progress.failed.insert(tool);
            }
            DispatchOutcome::Duplicate(tool) => {
                let error = BriefError::ToolMisuse { tool: tool.as_str().to_string() };
                warn!(
                    event_name = "agent.tool.duplicate_call",
                    run_id = %context.run_id,
                    tool = tool.as_str(),
                    error_class = error.error_class(),
                    "tool already called in this run"
                );
            }
            DispatchOutcome::UnknownTool => {
                debug!(
                    event_name = "agent.tool.unknown",
                    run_id = %context.run_id,
                    tool = tool_name,
                    "model named an unknown tool"
                );
            }
        }

        info!(
            event_name = "agent.tool.dispatched",
            run_id = %context.run_id,
            tool = tool_name.trim(),
            outcome = ?dispatch.outcome,
            "tool dispatched"
        );

        context.steps.push(AgentStep {
            thought,
            tool: tool_name.trim().to_string(),
            args: dispatch.args,
            log,
            observation: dispatch.observation,
        });
    }

    fn finish(&self, context: &RunContext, answer: String) -> RunOutcome {
        let answer = answer.trim();
        if answer.is_empty() {
            return self.outcome(context, None, StopReason::EmptyAnswer);
        }
        let answer = if self.enforce_word_cap {
            cap_words(answer, BRIEF_WORD_LIMIT)
        } else {
            answer.to_string()
        };
        self.outcome(context, Some(answer), StopReason::Final)
    }

    fn exhausted(&self, context: &RunContext, kind: BudgetKind) -> RunOutcome {
        let error = BriefError::BudgetExceeded(kind);
        warn!(
            event_name = "agent.budget.exhausted",
            run_id = %context.run_id,
            error_class = error.error_class(),
            iterations = context.iterations,
            "{error}"
        );
        let reason = match kind {
            BudgetKind::Iterations => StopReason::IterationLimit,
            BudgetKind::WallClock => StopReason::TimeLimit,
        };
        self.outcome(context, None, reason)
    }

    fn outcome(
        &self,
        context: &RunContext,
        answer: Option<String>,
        stop_reason: StopReason,
    ) -> RunOutcome {
        RunOutcome {
            answer,
            stop_reason,
            iterations: context.iterations,
            tool_calls: context.ledger.len(),
        }
    }
}

fn action_log(thought: &str, tool: ToolName, input: &ActionInput) -> String {
    let action = format!("Action: {tool}\nAction Input: {input}");
    if thought.trim().is_empty() {
        action
    } else {
        format!("{}\n{action}", thought.trim())
    }
}
