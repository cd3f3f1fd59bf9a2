pub mod brief;
pub mod config;
pub mod domain;
pub mod errors;

pub use brief::{
    cap_words, derive_risk_flags, word_count, BriefDocument, BriefSection, RiskFlag,
    BRIEF_WORD_LIMIT, LIMIT_REACHED_MESSAGE, NOT_AVAILABLE,
};
pub use domain::account::{ClientId, ClientProfile, Contact};
pub use domain::interaction::InteractionRecord;
pub use domain::kpi::{KpiRecord, KpiSeries};
pub use domain::note::NoteSnippet;
pub use domain::ticket::{Ticket, TicketPriority, TicketStatus};
pub use domain::{client_slug, parse_timestamp};
pub use errors::{BriefError, BudgetKind};
