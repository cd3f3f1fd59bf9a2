use std::cmp::Reverse;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    Open,
    Pending,
    Resolved,
    Closed,
    Other(String),
}

impl TicketStatus {
    /// Open sorts before Pending, which sorts before every other status.
    pub fn sort_rank(&self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Pending => 1,
            _ => 2,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Open | Self::Pending)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "Open",
            Self::Pending => "Pending",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for TicketStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Open" => Self::Open,
            "Pending" => Self::Pending,
            "Resolved" => Self::Resolved,
            "Closed" => Self::Closed,
            _ => Self::Other(value),
        }
    }
}

impl From<TicketStatus> for String {
    fn from(value: TicketStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Other(String),
}

impl TicketPriority {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for TicketPriority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Low" => Self::Low,
            "Medium" => Self::Medium,
            "High" => Self::High,
            _ => Self::Other(value),
        }
    }
}

impl From<TicketPriority> for String {
    fn from(value: TicketPriority) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: i64,
    pub category: String,
    pub status: TicketStatus,
    pub opened_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
    pub resolution_time_days: Option<f64>,
    pub priority: TicketPriority,
}

impl Ticket {
    pub fn is_high_priority_pending(&self) -> bool {
        self.priority == TicketPriority::High && self.status.is_unresolved()
    }
}

/// Open, then Pending, then everything else; newest first inside each bucket.
pub fn sort_tickets(tickets: &mut [Ticket]) {
    tickets.sort_by_key(|ticket| (ticket.status.sort_rank(), Reverse(ticket.opened_at)));
}
