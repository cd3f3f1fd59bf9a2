use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use precall_core::brief::{
    cap_words, derive_risk_flags, kpi_line, overview_line, references_line, risk_line,
    talking_points_line, BriefDocument, BriefSection, BRIEF_WORD_LIMIT, LIMIT_REACHED_MESSAGE,
};
use precall_core::errors::BriefError;
use precall_db::AccountRepository;
use precall_retrieval::NoteSearch;

use crate::normalize::ToolDefaults;
use crate::prompt::BriefKind;

/// Builds a brief straight from the collaborators, without the model. Used when the
/// loop ends without an answer.
pub struct FallbackSynthesizer {
    repository: Arc<dyn AccountRepository>,
    notes: Arc<dyn NoteSearch>,
    defaults: ToolDefaults,
    timeout: Duration,
}

impl FallbackSynthesizer {
    pub fn new(
        repository: Arc<dyn AccountRepository>,
        notes: Arc<dyn NoteSearch>,
        defaults: ToolDefaults,
        timeout: Duration,
    ) -> Self {
        Self { repository, notes, defaults, timeout }
    }

    /// Never fails: a collaborator error blanks its own section, and running past the
    /// timeout yields [`LIMIT_REACHED_MESSAGE`].
    pub async fn synthesize(&self, client_name: &str, kind: BriefKind) -> String {
        info!(
            event_name = "agent.fallback.started",
            client_name,
            kind = ?kind,
            "building brief without the model"
        );

        let Ok(document) = tokio::time::timeout(self.timeout, self.document(client_name)).await
        else {
            warn!(
                event_name = "agent.fallback.timed_out",
                client_name,
                timeout_ms = self.timeout.as_millis() as u64,
                "fallback brief timed out"
            );
            return LIMIT_REACHED_MESSAGE.to_string();
        };

        match kind {
            BriefKind::Full => document.render(),
            BriefKind::TalkingPointsOnly => cap_words(
                &format!(
                    "{}: {}",
                    BriefSection::TalkingPoints.label(),
                    document.section(BriefSection::TalkingPoints)
                ),
                BRIEF_WORD_LIMIT,
            ),
        }
    }

    pub async fn document(&self, client_name: &str) -> BriefDocument {
        let profile = degrade(
            BriefSection::Overview,
            self.repository.client_overview(client_name).await,
        )
        .flatten();
        let kpis = degrade(
            BriefSection::Kpis,
            self.repository.kpi_snapshot(client_name, self.defaults.kpi_months).await,
        )
        .unwrap_or_default();
        let interactions = degrade(
            BriefSection::TalkingPoints,
            self.repository
                .recent_interactions(client_name, self.defaults.interaction_limit)
                .await,
        )
        .unwrap_or_default();
        let tickets = degrade(
            BriefSection::Risks,
            self.repository.open_tickets(client_name, None).await,
        )
        .unwrap_or_default();
        let snippets = degrade(
            BriefSection::References,
            self.notes
                .search(client_name, self.defaults.notes_k as usize, Some(client_name))
                .await,
        )
        .unwrap_or_default();

        BriefDocument {
            overview: overview_line(profile.as_ref()),
            talking_points: talking_points_line(&interactions),
            kpis: kpi_line(&kpis),
            risks: risk_line(&derive_risk_flags(&kpis, &tickets)),
            references: references_line(&snippets),
        }
    }
}

fn degrade<T, E: Display>(section: BriefSection, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(source) => {
            let error = BriefError::DataAccess(source.to_string());
            warn!(
                event_name = "agent.fallback.section_degraded",
                section = section.label(),
                error_class = error.error_class(),
                error = %error,
                "fallback section unavailable"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use precall_core::brief::{word_count, BRIEF_WORD_LIMIT, LIMIT_REACHED_MESSAGE};
    use precall_core::domain::note::NoteSnippet;
    use precall_db::{DemoDataset, InMemoryAccountRepository};
    use precall_retrieval::{NoteSearch, RetrievalError};

    use super::FallbackSynthesizer;
    use crate::normalize::ToolDefaults;
    use crate::prompt::BriefKind;

    struct FixedNotes(Vec<NoteSnippet>);

    #[async_trait]
    impl NoteSearch for FixedNotes {
        async fn search(
            &self,
            _query: &str,
            k: usize,
            _client_name: Option<&str>,
        ) -> Result<Vec<NoteSnippet>, RetrievalError> {
            Ok(self.0.iter().take(k).cloned().collect())
        }
    }

    struct BrokenNotes;

    #[async_trait]
    impl NoteSearch for BrokenNotes {
        async fn search(
            &self,
            _query: &str,
            _k: usize,
            _client_name: Option<&str>,
        ) -> Result<Vec<NoteSnippet>, RetrievalError> {
            Err(RetrievalError::Embedding("embedding service down".to_string()))
        }
    }

    struct SlowNotes;

    #[async_trait]
    impl NoteSearch for SlowNotes {
        async fn search(
            &self,
            _query: &str,
            _k: usize,
            _client_name: Option<&str>,
        ) -> Result<Vec<NoteSnippet>, RetrievalError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    fn synthesizer(notes: Arc<dyn NoteSearch>, timeout: Duration) -> FallbackSynthesizer {
        let accounts = DemoDataset::accounts().expect("demo accounts");
        FallbackSynthesizer::new(
            Arc::new(InMemoryAccountRepository::with_accounts(accounts)),
            notes,
            ToolDefaults::default(),
            timeout,
        )
    }

    #[tokio::test]
    async fn acme_brief_has_every_section_and_all_risk_flags() {
        let notes = Arc::new(FixedNotes(vec![NoteSnippet::new(
            "Renewal at risk",
            "acme_ltd_2024-06-12_qbr.txt",
        )]));
        let brief = synthesizer(notes, Duration::from_secs(5))
            .synthesize("Acme Ltd", BriefKind::Full)
            .await;

        let lines = brief.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 5, "{brief}");
        assert!(lines[0].starts_with("Overview: Acme Ltd |"));
        assert_eq!(
            lines[3],
            "Risks: Elevated churn risk, Multiple open tickets, High-priority ticket pending"
        );
        assert_eq!(lines[4], "References: acme_ltd_2024-06-12_qbr.txt");
        assert!(word_count(&brief) <= BRIEF_WORD_LIMIT);
    }

    #[tokio::test]
    async fn unknown_client_degrades_to_not_available() {
        let brief = synthesizer(Arc::new(FixedNotes(Vec::new())), Duration::from_secs(5))
            .synthesize("Ghost Corp", BriefKind::Full)
            .await;

        assert_eq!(
            brief,
            "Overview: Not available\nTalking points: Not available\nKPIs: Not available\n\
             Risks: Not available\nReferences: Not available"
        );
    }

    #[tokio::test]
    async fn failing_notes_only_blank_the_references_line() {
        let brief = synthesizer(Arc::new(BrokenNotes), Duration::from_secs(5))
            .synthesize("Acme Ltd", BriefKind::Full)
            .await;

        assert!(brief.contains("References: Not available"));
        assert!(brief.starts_with("Overview: Acme Ltd |"));
    }

    #[tokio::test]
    async fn talking_points_kind_returns_one_line() {
        let brief = synthesizer(Arc::new(FixedNotes(Vec::new())), Duration::from_secs(5))
            .synthesize("Acme Ltd", BriefKind::TalkingPointsOnly)
            .await;

        assert!(brief.starts_with("Talking points: "));
        assert_eq!(brief.lines().count(), 1);
    }

    #[tokio::test]
    async fn slow_collaborators_yield_the_limit_message() {
        let brief = synthesizer(Arc::new(SlowNotes), Duration::from_millis(50))
            .synthesize("Acme Ltd", BriefKind::Full)
            .await;

        assert_eq!(brief, LIMIT_REACHED_MESSAGE);
    }
}
