use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use precall_core::brief::LIMIT_REACHED_MESSAGE;
use precall_core::config::AgentConfig;
use precall_db::AccountRepository;
use precall_retrieval::NoteSearch;

use crate::fallback::FallbackSynthesizer;
use crate::llm::LlmClient;
use crate::normalize::ToolDefaults;
use crate::prompt::{BriefKind, PromptBuilder, PromptError};
use crate::runtime::{BriefRequest, Orchestrator, RunBudget, RunContext, StopReason};
use crate::tools::ToolRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BriefSource {
    Model,
    Fallback,
    LimitMessage,
}

impl BriefSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Fallback => "fallback",
            Self::LimitMessage => "limit_message",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BriefReport {
    pub text: String,
    pub source: BriefSource,
    pub run_id: Uuid,
    pub iterations: u32,
    pub tool_calls: usize,
    pub stop_reason: StopReason,
}

/// Entry point for producing briefs: the model-driven loop first, the deterministic
/// synthesizer when the loop gives up.
pub struct BriefService {
    orchestrator: Orchestrator,
    fallback: FallbackSynthesizer,
}

impl BriefService {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        repository: Arc<dyn AccountRepository>,
        notes: Arc<dyn NoteSearch>,
        config: &AgentConfig,
    ) -> Result<Self, PromptError> {
        let defaults = ToolDefaults::from(config);
        let budget = RunBudget::from(config);
        let registry = ToolRegistry::standard(Arc::clone(&repository), Arc::clone(&notes));
        let orchestrator =
            Orchestrator::new(llm, registry, PromptBuilder::new(&defaults)?, budget, defaults)
                .with_word_cap(config.enforce_word_cap);
        let fallback = FallbackSynthesizer::new(repository, notes, defaults, budget.max_execution);

        Ok(Self::from_parts(orchestrator, fallback))
    }

    pub fn from_parts(orchestrator: Orchestrator, fallback: FallbackSynthesizer) -> Self {
        Self { orchestrator, fallback }
    }

    pub async fn generate(&self, client_name: &str) -> String {
        self.generate_with(client_name, BriefKind::Full).await
    }

    pub async fn generate_with(&self, client_name: &str, kind: BriefKind) -> String {
        self.generate_report(client_name, kind).await.text
    }

    pub async fn generate_report(&self, client_name: &str, kind: BriefKind) -> BriefReport {
        let request = BriefRequest::new(client_name, kind);
        let mut context = RunContext::new();
        let outcome = self.orchestrator.run(&request, &mut context).await;

        let (text, source) = match outcome.answer {
            Some(answer) => (answer, BriefSource::Model),
            None => {
                let text = self.fallback.synthesize(&request.client_name, kind).await;
                let source = if text == LIMIT_REACHED_MESSAGE {
                    BriefSource::LimitMessage
                } else {
                    BriefSource::Fallback
                };
                (text, source)
            }
        };

        info!(
            event_name = "agent.brief.completed",
            run_id = %context.run_id,
            source = source.as_str(),
            stop_reason = outcome.stop_reason.as_str(),
            "brief ready"
        );

        BriefReport {
            text,
            source,
            run_id: context.run_id,
            iterations: outcome.iterations,
            tool_calls: outcome.tool_calls,
            stop_reason: outcome.stop_reason,
        }
    }

    pub fn budget(&self) -> RunBudget {
        self.orchestrator.budget()
    }
}
