use std::fmt;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BudgetKind {
    Iterations,
    WallClock,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iterations => f.write_str("iteration limit"),
            Self::WallClock => f.write_str("time limit"),
        }
    }
}

/// Failure modes of one brief-generation run. None of them reaches the end user raw;
/// the orchestrator logs them by `error_class` and keeps the run producing a brief.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BriefError {
    #[error("could not parse model output: {0}")]
    Parse(String),
    #[error("tool `{tool}` was already called in this run")]
    ToolMisuse { tool: String },
    #[error("client `{0}` was not found")]
    NotFound(String),
    #[error("run stopped: {0} reached")]
    BudgetExceeded(BudgetKind),
    #[error("data access failure: {0}")]
    DataAccess(String),
}

impl BriefError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::ToolMisuse { .. } => "tool_misuse",
            Self::NotFound(_) => "not_found",
            Self::BudgetExceeded(_) => "budget_exceeded",
            Self::DataAccess(_) => "data_access",
        }
    }
}
