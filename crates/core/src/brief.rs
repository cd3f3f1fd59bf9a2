//! Brief document model and the deterministic derivation rules shared by both
//! production paths (model-driven and fallback).

use rust_decimal::Decimal;

use crate::domain::account::ClientProfile;
use crate::domain::interaction::InteractionRecord;
use crate::domain::kpi::{KpiMetric, KpiSeries};
use crate::domain::note::NoteSnippet;
use crate::domain::ticket::Ticket;

pub const NOT_AVAILABLE: &str = "Not available";
pub const BRIEF_WORD_LIMIT: usize = 150;
pub const LIMIT_REACHED_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

pub const CHURN_RISK_THRESHOLD: f64 = 15.0;
pub const OPEN_TICKET_THRESHOLD: i64 = 2;
pub const TALKING_POINTS_MAX_CHARS: usize = 200;
const TALKING_POINT_INTERACTIONS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BriefSection {
    Overview,
    TalkingPoints,
    Kpis,
    Risks,
    References,
}

impl BriefSection {
    pub const ORDER: [BriefSection; 5] =
        [Self::Overview, Self::TalkingPoints, Self::Kpis, Self::Risks, Self::References];

    pub fn label(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::TalkingPoints => "Talking points",
            Self::Kpis => "KPIs",
            Self::Risks => "Risks",
            Self::References => "References",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BriefDocument {
    pub overview: String,
    pub talking_points: String,
    pub kpis: String,
    pub risks: String,
    pub references: String,
}

impl Default for BriefDocument {
    fn default() -> Self {
        Self {
            overview: NOT_AVAILABLE.to_string(),
            talking_points: NOT_AVAILABLE.to_string(),
            kpis: NOT_AVAILABLE.to_string(),
            risks: NOT_AVAILABLE.to_string(),
            references: NOT_AVAILABLE.to_string(),
        }
    }
}

impl BriefDocument {
    pub fn section(&self, section: BriefSection) -> &str {
        match section {
            BriefSection::Overview => &self.overview,
            BriefSection::TalkingPoints => &self.talking_points,
            BriefSection::Kpis => &self.kpis,
            BriefSection::Risks => &self.risks,
            BriefSection::References => &self.references,
        }
    }

    /// Five labelled lines in fixed order, capped at [`BRIEF_WORD_LIMIT`] words.
    pub fn render(&self) -> String {
        let lines = BriefSection::ORDER
            .iter()
            .map(|section| format!("{}: {}", section.label(), self.section(*section)))
            .collect::<Vec<_>>();
        cap_words(&lines.join("\n"), BRIEF_WORD_LIMIT)
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Cuts `text` right after its `max_words`-th word. Line breaks and spacing before the
/// cut are preserved; words are never split.
pub fn cap_words(text: &str, max_words: usize) -> String {
    if max_words == 0 {
        return String::new();
    }

    let mut words_seen = 0usize;
    let mut in_word = false;
    for (index, character) in text.char_indices() {
        if character.is_whitespace() {
            if in_word {
                in_word = false;
                if words_seen == max_words {
                    return text[..index].to_string();
                }
            }
        } else if !in_word {
            in_word = true;
            words_seen += 1;
        }
    }

    text.to_string()
}

pub fn overview_line(profile: Option<&ClientProfile>) -> String {
    profile.map(ClientProfile::overview_line).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Latest-month KPI line. Spend is printed as a whole amount; trend arrows are appended
/// when the series holds at least two months.
pub fn kpi_line(series: &KpiSeries) -> String {
    let Some(latest) = series.latest() else {
        return NOT_AVAILABLE.to_string();
    };

    let mut parts = Vec::new();
    if let Some(spend) = latest.spend {
        parts.push(format!("spend {}", format_whole_amount(spend)));
    }
    if let Some(satisfaction) = latest.satisfaction_score {
        parts.push(format!("satisfaction {satisfaction}"));
    }
    if let Some(churn) = latest.churn_risk {
        parts.push(format!("churn risk {churn}%"));
    }
    if parts.is_empty() {
        return NOT_AVAILABLE.to_string();
    }

    let trends = [KpiMetric::Spend, KpiMetric::Satisfaction, KpiMetric::ChurnRisk]
        .into_iter()
        .filter_map(|metric| {
            series.trend(metric).map(|trend| format!("{} {}", metric.label(), trend.arrow()))
        })
        .collect::<Vec<_>>();

    let mut line = format!("{} ({})", parts.join(", "), latest.month);
    if !trends.is_empty() {
        line.push_str(&format!("; trend: {}", trends.join(", ")));
    }
    line
}

fn format_whole_amount(amount: Decimal) -> String {
    amount.round().normalize().to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskFlag {
    ElevatedChurnRisk,
    MultipleOpenTickets,
    HighPriorityTicketPending,
}

impl RiskFlag {
    pub fn label(self) -> &'static str {
        match self {
            Self::ElevatedChurnRisk => "Elevated churn risk",
            Self::MultipleOpenTickets => "Multiple open tickets",
            Self::HighPriorityTicketPending => "High-priority ticket pending",
        }
    }
}

/// Risk conditions against the most recent KPI record and the full ticket set, in
/// fixed evaluation order.
pub fn derive_risk_flags(series: &KpiSeries, tickets: &[Ticket]) -> Vec<RiskFlag> {
    let mut flags = Vec::new();
    if let Some(latest) = series.latest() {
        if latest.churn_risk.is_some_and(|churn| churn >= CHURN_RISK_THRESHOLD) {
            flags.push(RiskFlag::ElevatedChurnRisk);
        }
        if latest.open_tickets.is_some_and(|open| open >= OPEN_TICKET_THRESHOLD) {
            flags.push(RiskFlag::MultipleOpenTickets);
        }
    }
    if tickets.iter().any(Ticket::is_high_priority_pending) {
        flags.push(RiskFlag::HighPriorityTicketPending);
    }
    flags
}

pub fn risk_line(flags: &[RiskFlag]) -> String {
    if flags.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    flags.iter().map(|flag| flag.label()).collect::<Vec<_>>().join(", ")
}

/// Notes of the two most recent interactions (input is newest first), `; `-joined and
/// cut to [`TALKING_POINTS_MAX_CHARS`].
pub fn talking_points_line(interactions: &[InteractionRecord]) -> String {
    let notes = interactions
        .iter()
        .take(TALKING_POINT_INTERACTIONS)
        .filter_map(InteractionRecord::note_text)
        .collect::<Vec<_>>();
    if notes.is_empty() {
        return NOT_AVAILABLE.to_string();
    }

    notes.join("; ").chars().take(TALKING_POINTS_MAX_CHARS).collect()
}

pub fn references_line(snippets: &[NoteSnippet]) -> String {
    let sources = snippets
        .iter()
        .map(|snippet| snippet.source.trim())
        .filter(|source| !source.is_empty())
        .collect::<Vec<_>>();
    if sources.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    sources.join(", ")
}
