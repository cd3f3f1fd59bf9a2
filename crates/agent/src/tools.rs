use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use precall_db::AccountRepository;
use precall_retrieval::NoteSearch;

use crate::ledger::{ToolCallLedger, ALREADY_CALLED_OBSERVATION};
use crate::normalize::{ActionInput, CallArgs, ToolDefaults};

pub const NOT_FOUND_OBSERVATION: &str = "Not found";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolName {
    ClientOverview,
    KpiSnapshot,
    RecentInteractions,
    OpenTickets,
    NotesSearch,
}

impl ToolName {
    /// Presentation order in the prompt; it hints the intended flow.
    pub const ALL: [ToolName; 5] = [
        Self::ClientOverview,
        Self::KpiSnapshot,
        Self::RecentInteractions,
        Self::OpenTickets,
        Self::NotesSearch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientOverview => "client_overview",
            Self::KpiSnapshot => "kpi_snapshot",
            Self::RecentInteractions => "recent_interactions",
            Self::OpenTickets => "open_tickets",
            Self::NotesSearch => "notes_search",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().trim_matches('`');
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ClientOverview => "Get a client's profile fields by company name.",
            Self::KpiSnapshot => {
                "Get last N months of KPIs (spend, satisfaction, churn, open_tickets)."
            }
            Self::RecentInteractions => "Get the latest interactions for a client.",
            Self::OpenTickets => {
                "List tickets for a client; optional exact status filter (Open/Pending/Resolved)."
            }
            Self::NotesSearch => {
                "Semantic search over meeting notes; returns short snippets with sources."
            }
        }
    }

    pub fn signature(self) -> &'static str {
        match self {
            Self::ClientOverview => "client_name: str",
            Self::KpiSnapshot => "client_name: str, months: int = 3",
            Self::RecentInteractions => "client_name: str, limit: int = 5",
            Self::OpenTickets => "client_name: str, status: Optional[str] = None",
            Self::NotesSearch => "query: str, k: int = 3, client_name: Optional[str] = None",
        }
    }

    /// Data sources that count towards the early-stop threshold.
    pub fn is_data_source(self) -> bool {
        !matches!(self, Self::ClientOverview)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    Data(Value),
    NotFound,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;
    async fn execute(&self, args: &CallArgs) -> Result<ToolOutput>;
}

fn unexpected_args(tool: ToolName, args: &CallArgs) -> anyhow::Error {
    anyhow::anyhow!("{tool} received arguments for {}", args.tool())
}

pub struct ClientOverviewTool {
    repository: Arc<dyn AccountRepository>,
}

#[async_trait]
impl Tool for ClientOverviewTool {
    fn name(&self) -> ToolName {
        ToolName::ClientOverview
    }

    async fn execute(&self, args: &CallArgs) -> Result<ToolOutput> {
        let CallArgs::ClientOverview { client_name } = args else {
            return Err(unexpected_args(self.name(), args));
        };
        Ok(match self.repository.client_overview(client_name).await? {
            Some(profile) => ToolOutput::Data(serde_json::to_value(profile)?),
            None => ToolOutput::NotFound,
        })
    }
}

pub struct KpiSnapshotTool {
    repository: Arc<dyn AccountRepository>,
}

#[async_trait]
impl Tool for KpiSnapshotTool {
    fn name(&self) -> ToolName {
        ToolName::KpiSnapshot
    }

    async fn execute(&self, args: &CallArgs) -> Result<ToolOutput> {
        let CallArgs::KpiSnapshot { client_name, months } = args else {
            return Err(unexpected_args(self.name(), args));
        };
        let series = self.repository.kpi_snapshot(client_name, *months).await?;
        Ok(ToolOutput::Data(serde_json::to_value(series)?))
    }
}

pub struct RecentInteractionsTool {
    repository: Arc<dyn AccountRepository>,
}

#[async_trait]
impl Tool for RecentInteractionsTool {
    fn name(&self) -> ToolName {
        ToolName::RecentInteractions
    }

    async fn execute(&self, args: &CallArgs) -> Result<ToolOutput> {
        let CallArgs::RecentInteractions { client_name, limit } = args else {
            return Err(unexpected_args(self.name(), args));
        };
        let interactions = self.repository.recent_interactions(client_name, *limit).await?;
        Ok(ToolOutput::Data(serde_json::to_value(interactions)?))
    }
}

pub struct OpenTicketsTool {
    repository: Arc<dyn AccountRepository>,
}

#[async_trait]
impl Tool for OpenTicketsTool {
    fn name(&self) -> ToolName {
        ToolName::OpenTickets
    }

    async fn execute(&self, args: &CallArgs) -> Result<ToolOutput> {
        let CallArgs::OpenTickets { client_name, status } = args else {
            return Err(unexpected_args(self.name(), args));
        };
        let tickets = self.repository.open_tickets(client_name, status.as_deref()).await?;
        Ok(ToolOutput::Data(serde_json::to_value(tickets)?))
    }
}

pub struct NotesSearchTool {
    notes: Arc<dyn NoteSearch>,
}

#[async_trait]
impl Tool for NotesSearchTool {
    fn name(&self) -> ToolName {
        ToolName::NotesSearch
    }

    async fn execute(&self, args: &CallArgs) -> Result<ToolOutput> {
        let CallArgs::NotesSearch { query, k, client_name } = args else {
            return Err(unexpected_args(self.name(), args));
        };
        let snippets = self.notes.search(query, *k as usize, client_name.as_deref()).await?;
        Ok(ToolOutput::Data(serde_json::to_value(snippets)?))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    Executed(ToolName),
    NotFound(ToolName),
    Duplicate(ToolName),
    Failed(ToolName),
    UnknownTool,
}

/// What the model sees after an action, plus how the registry handled it.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispatch {
    pub observation: String,
    pub outcome: DispatchOutcome,
    pub args: Option<CallArgs>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolName, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// The five account and notes tools over the given collaborators.
    pub fn standard(repository: Arc<dyn AccountRepository>, notes: Arc<dyn NoteSearch>) -> Self {
        let mut registry = Self::default();
        registry.register(ClientOverviewTool { repository: Arc::clone(&repository) });
        registry.register(KpiSnapshotTool { repository: Arc::clone(&repository) });
        registry.register(RecentInteractionsTool { repository: Arc::clone(&repository) });
        registry.register(OpenTicketsTool { repository });
        registry.register(NotesSearchTool { notes });
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<ToolName> {
        ToolName::ALL.into_iter().filter(|name| self.tools.contains_key(name)).collect()
    }

    /// `name(signature) - description` lines for the prompt.
    pub fn describe(&self) -> String {
        self.names()
            .into_iter()
            .map(|name| format!("{name}({}) - {}", name.signature(), name.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_names(&self) -> String {
        self.names().iter().map(|name| name.as_str()).collect::<Vec<_>>().join(", ")
    }

    /// Runs `tool_name` at most once per ledger. Repeats, unknown names and collaborator
    /// failures come back as observations rather than errors.
    pub async fn dispatch(
        &self,
        ledger: &mut ToolCallLedger,
        tool_name: &str,
        input: &ActionInput,
        defaults: &ToolDefaults,
    ) -> Dispatch {
        let Some((name, tool)) =
            ToolName::parse(tool_name).and_then(|name| self.tools.get(&name).map(|t| (name, t)))
        else {
            return Dispatch {
                observation: format!(
                    "{} is not a valid tool, try one of [{}].",
                    tool_name.trim(),
                    self.tool_names()
                ),
                outcome: DispatchOutcome::UnknownTool,
                args: None,
            };
        };

        if ledger.register(name) {
            return Dispatch {
                observation: ALREADY_CALLED_OBSERVATION.to_string(),
                outcome: DispatchOutcome::Duplicate(name),
                args: None,
            };
        }

        let args = CallArgs::normalize(name, input, defaults);
        match tool.execute(&args).await {
            Ok(ToolOutput::Data(value)) => Dispatch {
                observation: value.to_string(),
                outcome: DispatchOutcome::Executed(name),
                args: Some(args),
            },
            Ok(ToolOutput::NotFound) => Dispatch {
                observation: NOT_FOUND_OBSERVATION.to_string(),
                outcome: DispatchOutcome::NotFound(name),
                args: Some(args),
            },
            Err(error) => Dispatch {
                observation: format!("Error: {name} failed: {error}"),
                outcome: DispatchOutcome::Failed(name),
                args: Some(args),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use precall_core::domain::note::NoteSnippet;
    use precall_db::InMemoryAccountRepository;
    use precall_retrieval::{NoteSearch, RetrievalError};

    use super::{DispatchOutcome, ToolName, ToolRegistry};
    use crate::ledger::{ToolCallLedger, ALREADY_CALLED_OBSERVATION};
    use crate::normalize::{ActionInput, ToolDefaults};

    struct NoNotes;

    #[async_trait]
    impl NoteSearch for NoNotes {
        async fn search(
            &self,
            _query: &str,
            _k: usize,
            _client_name: Option<&str>,
        ) -> Result<Vec<NoteSnippet>, RetrievalError> {
            Ok(Vec::new())
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::standard(Arc::new(InMemoryAccountRepository::default()), Arc::new(NoNotes))
    }

    #[test]
    fn tool_names_round_trip_and_keep_prompt_order() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(
            registry().tool_names(),
            "client_overview, kpi_snapshot, recent_interactions, open_tickets, notes_search"
        );
    }

    #[tokio::test]
    async fn unknown_tool_does_not_touch_ledger() {
        let registry = registry();
        let mut ledger = ToolCallLedger::new();

        let dispatch = registry
            .dispatch(&mut ledger, "crm_lookup", &ActionInput::from_raw("Acme"), &ToolDefaults::default())
            .await;

        assert_eq!(dispatch.outcome, DispatchOutcome::UnknownTool);
        assert!(dispatch.observation.starts_with("crm_lookup is not a valid tool, try one of ["));
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn missing_client_is_reported_as_not_found() {
        let registry = registry();
        let mut ledger = ToolCallLedger::new();

        let dispatch = registry
            .dispatch(
                &mut ledger,
                "client_overview",
                &ActionInput::from_raw("Ghost Corp"),
                &ToolDefaults::default(),
            )
            .await;

        assert_eq!(dispatch.outcome, DispatchOutcome::NotFound(ToolName::ClientOverview));
        assert_eq!(dispatch.observation, "Not found");
    }

    #[tokio::test]
    async fn repeated_call_returns_sentinel() {
        let registry = registry();
        let mut ledger = ToolCallLedger::new();
        let input = ActionInput::from_raw("Acme Ltd");
        let defaults = ToolDefaults::default();

        let first = registry.dispatch(&mut ledger, "kpi_snapshot", &input, &defaults).await;
        let second = registry.dispatch(&mut ledger, "kpi_snapshot", &input, &defaults).await;

        assert_eq!(first.outcome, DispatchOutcome::Executed(ToolName::KpiSnapshot));
        assert_eq!(first.observation, "[]");
        assert_eq!(second.outcome, DispatchOutcome::Duplicate(ToolName::KpiSnapshot));
        assert_eq!(second.observation, ALREADY_CALLED_OBSERVATION);
    }
}
