use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use precall_agent::{BriefService, LlmClient, LlmError};
use precall_core::config::{AgentConfig, AppConfig};
use precall_core::domain::account::ClientProfile;
use precall_core::domain::interaction::InteractionRecord;
use precall_core::domain::kpi::KpiSeries;
use precall_core::domain::note::NoteSnippet;
use precall_core::domain::ticket::Ticket;
use precall_db::{AccountRepository, DemoDataset, InMemoryAccountRepository, RepositoryError};
use precall_retrieval::{NoteSearch, RetrievalError};

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Replays canned completions in order and keeps every prompt it was sent.
#[derive(Default)]
pub struct ScriptedLlm {
    completions: Mutex<VecDeque<String>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new<I, S>(completions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            completions: Mutex::new(completions.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    /// Answers from the prompt text instead of a queue, so interleaved runs each see
    /// a consistent conversation.
    pub fn responding<F>(respond: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self { responder: Some(Box::new(respond)), ..Self::default() }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompts lock").len()
    }

    pub fn prompt(&self, index: usize) -> String {
        self.prompts.lock().expect("prompts lock").get(index).cloned().unwrap_or_default()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().expect("prompts lock").last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().expect("prompts lock").push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(respond) = &self.responder {
            return Ok(respond(prompt));
        }
        self.completions.lock().expect("completions lock").pop_front().ok_or(LlmError::EmptyCompletion)
    }
}

/// Demo accounts behind per-method call counters.
pub struct CountingRepository {
    inner: InMemoryAccountRepository,
    pub overview_calls: AtomicUsize,
    pub kpi_calls: AtomicUsize,
    pub interaction_calls: AtomicUsize,
    pub ticket_calls: AtomicUsize,
    pub last_kpi_months: AtomicU32,
    /// When set, KPI, interaction and ticket lookups return a database error.
    pub fail_data_calls: AtomicBool,
}

impl CountingRepository {
    pub fn demo() -> Self {
        let accounts = DemoDataset::accounts().expect("demo accounts");
        Self {
            inner: InMemoryAccountRepository::with_accounts(accounts),
            overview_calls: AtomicUsize::new(0),
            kpi_calls: AtomicUsize::new(0),
            interaction_calls: AtomicUsize::new(0),
            ticket_calls: AtomicUsize::new(0),
            last_kpi_months: AtomicU32::new(0),
            fail_data_calls: AtomicBool::new(false),
        }
    }

    fn check_data_access(&self) -> Result<(), RepositoryError> {
        if self.fail_data_calls.load(Ordering::SeqCst) {
            return Err(RepositoryError::Decode("metrics table is locked".to_string()));
        }
        Ok(())
    }

    pub fn data_calls(&self) -> usize {
        self.kpi_calls.load(Ordering::SeqCst)
            + self.interaction_calls.load(Ordering::SeqCst)
            + self.ticket_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountRepository for CountingRepository {
    async fn client_overview(
        &self,
        client_name: &str,
    ) -> Result<Option<ClientProfile>, RepositoryError> {
        self.overview_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.client_overview(client_name).await
    }

    async fn kpi_snapshot(
        &self,
        client_name: &str,
        months: u32,
    ) -> Result<KpiSeries, RepositoryError> {
        self.kpi_calls.fetch_add(1, Ordering::SeqCst);
        self.last_kpi_months.store(months, Ordering::SeqCst);
        self.check_data_access()?;
        self.inner.kpi_snapshot(client_name, months).await
    }

    async fn recent_interactions(
        &self,
        client_name: &str,
        limit: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        self.interaction_calls.fetch_add(1, Ordering::SeqCst);
        self.check_data_access()?;
        self.inner.recent_interactions(client_name, limit).await
    }

    async fn open_tickets(
        &self,
        client_name: &str,
        status: Option<&str>,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        self.ticket_calls.fetch_add(1, Ordering::SeqCst);
        self.check_data_access()?;
        self.inner.open_tickets(client_name, status).await
    }

    async fn list_clients(&self, limit: u32) -> Result<Vec<ClientProfile>, RepositoryError> {
        self.inner.list_clients(limit).await
    }
}

/// Returns a fixed snippet list and records every query.
#[derive(Default)]
pub struct CountingNotes {
    snippets: Vec<NoteSnippet>,
    queries: Mutex<Vec<(String, usize, Option<String>)>>,
}

impl CountingNotes {
    pub fn with_snippets(snippets: Vec<NoteSnippet>) -> Self {
        Self { snippets, queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<(String, usize, Option<String>)> {
        self.queries.lock().expect("queries lock").clone()
    }
}

#[async_trait]
impl NoteSearch for CountingNotes {
    async fn search(
        &self,
        query: &str,
        k: usize,
        client_name: Option<&str>,
    ) -> Result<Vec<NoteSnippet>, RetrievalError> {
        self.queries.lock().expect("queries lock").push((
            query.to_string(),
            k,
            client_name.map(str::to_string),
        ));
        Ok(self.snippets.iter().take(k).cloned().collect())
    }
}

pub struct Harness {
    pub llm: Arc<ScriptedLlm>,
    pub repository: Arc<CountingRepository>,
    pub notes: Arc<CountingNotes>,
    pub service: BriefService,
}

pub fn agent_config() -> AgentConfig {
    AppConfig::default().agent
}

pub fn harness(llm: ScriptedLlm, config: &AgentConfig) -> Harness {
    let llm = Arc::new(llm);
    let repository = Arc::new(CountingRepository::demo());
    let notes = Arc::new(CountingNotes::with_snippets(vec![NoteSnippet::new(
        "QBR: renewal blocked on SSO rollout.",
        "acme_ltd_2024-06-12_qbr.txt",
    )]));

    let service = BriefService::new(
        Arc::clone(&llm) as Arc<dyn LlmClient>,
        Arc::clone(&repository) as Arc<dyn AccountRepository>,
        Arc::clone(&notes) as Arc<dyn NoteSearch>,
        config,
    )
    .expect("brief service");

    Harness { llm, repository, notes, service }
}

pub fn action(tool: &str, input: &str) -> String {
    format!("I need more facts.\nAction: {tool}\nAction Input: {input}")
}

pub fn final_answer(answer: &str) -> String {
    format!("I now know the final answer\nFinal Answer: {answer}")
}

pub const ACME_BRIEF: &str = "Overview: Acme Ltd | Manufacturing | EMEA (Owner: Dana Reyes)\n\
Talking points: Confirm SSO rollout date\n\
KPIs: spend 12000, satisfaction 3.1, churn risk 20%\n\
Risks: Elevated churn risk\n\
References: acme_ltd_2024-06-12_qbr.txt";
