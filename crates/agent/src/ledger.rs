use std::collections::BTreeSet;

use crate::tools::ToolName;

/// Observation returned instead of re-running a tool that already fired in this run.
pub const ALREADY_CALLED_OBSERVATION: &str = "already called; do not call again";

/// Tools invoked so far in one run. Owned by a single run's context and never shared.
#[derive(Clone, Debug, Default)]
pub struct ToolCallLedger {
    used: BTreeSet<ToolName>,
}

impl ToolCallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tool` and reports whether it had already been recorded.
    pub fn register(&mut self, tool: ToolName) -> bool {
        !self.used.insert(tool)
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }

    pub fn contains(&self, tool: ToolName) -> bool {
        self.used.contains(&tool)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn used(&self) -> impl Iterator<Item = ToolName> + '_ {
        self.used.iter().copied()
    }
}
