use std::collections::BTreeSet;

use serde_json::json;

use crate::normalize::ActionInput;
use crate::tools::ToolName;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProfileState {
    #[default]
    Unresolved,
    Resolved,
    NotFound,
}

/// What the current run has learned so far. `observed` holds tools that returned an
/// answer (data or "Not found"); `failed` holds tools whose collaborator errored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunProgress {
    pub profile: ProfileState,
    pub observed: BTreeSet<ToolName>,
    pub failed: BTreeSet<ToolName>,
}

impl RunProgress {
    /// Only answered calls count toward the early stop.
    pub fn data_sources_observed(&self) -> usize {
        self.observed.iter().filter(|tool| tool.is_data_source()).count()
    }

    pub fn attempted(&self, tool: ToolName) -> bool {
        self.observed.contains(&tool) || self.failed.contains(&tool)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GuardrailDecision {
    Allow,
    /// Run `tool` with `input` instead of asking the model.
    Redirect { reason_code: &'static str, tool: ToolName, input: ActionInput },
    ForceFinal { reason_code: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub early_stop_threshold: usize,
    pub require_profile_first: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { early_stop_threshold: 2, require_profile_first: true }
    }
}

impl GuardrailPolicy {
    /// Checked before every model turn.
    pub fn before_turn(&self, progress: &RunProgress, client_name: &str) -> GuardrailDecision {
        match progress.profile {
            ProfileState::NotFound if !progress.attempted(ToolName::NotesSearch) => {
                GuardrailDecision::Redirect {
                    reason_code: "client_not_found",
                    tool: ToolName::NotesSearch,
                    input: notes_only_input(client_name),
                }
            }
            ProfileState::NotFound => GuardrailDecision::ForceFinal { reason_code: "client_not_found" },
            ProfileState::Resolved
                if progress.data_sources_observed() >= self.early_stop_threshold =>
            {
                GuardrailDecision::ForceFinal { reason_code: "enough_context" }
            }
            ProfileState::Resolved | ProfileState::Unresolved => GuardrailDecision::Allow,
        }
    }

    /// Checked against each action the model proposes. `tool` is `None` for names that
    /// are not registered tools; those fall through to the registry's own message.
    pub fn review_action(
        &self,
        progress: &RunProgress,
        tool: Option<ToolName>,
        client_name: &str,
    ) -> GuardrailDecision {
        let wants_other_tool = tool.is_some_and(|tool| tool != ToolName::ClientOverview);
        if self.require_profile_first
            && progress.profile == ProfileState::Unresolved
            && !progress.attempted(ToolName::ClientOverview)
            && wants_other_tool
        {
            return GuardrailDecision::Redirect {
                reason_code: "profile_first",
                tool: ToolName::ClientOverview,
                input: ActionInput::from_value(json!({ "client_name": client_name })),
            };
        }
        GuardrailDecision::Allow
    }
}

fn notes_only_input(client_name: &str) -> ActionInput {
    ActionInput::from_value(json!({ "query": client_name, "client_name": client_name }))
}

#[cfg(test)]
mod tests {
    use super::{GuardrailDecision, GuardrailPolicy, ProfileState, RunProgress};
    use crate::tools::ToolName;

    fn progress(profile: ProfileState, observed: &[ToolName]) -> RunProgress {
        RunProgress {
            profile,
            observed: observed.iter().copied().collect(),
            ..RunProgress::default()
        }
    }

    #[test]
    fn unresolved_profile_allows_the_overview_call() {
        let policy = GuardrailPolicy::default();
        let state = progress(ProfileState::Unresolved, &[]);

        assert_eq!(policy.before_turn(&state, "Acme Ltd"), GuardrailDecision::Allow);
        assert_eq!(
            policy.review_action(&state, Some(ToolName::ClientOverview), "Acme Ltd"),
            GuardrailDecision::Allow
        );
    }

    #[test]
    fn data_tools_before_resolution_are_redirected_to_overview() {
        let policy = GuardrailPolicy::default();
        let decision = policy.review_action(
            &progress(ProfileState::Unresolved, &[]),
            Some(ToolName::KpiSnapshot),
            "Acme Ltd",
        );

        match decision {
            GuardrailDecision::Redirect { reason_code, tool, input } => {
                assert_eq!(reason_code, "profile_first");
                assert_eq!(tool, ToolName::ClientOverview);
                assert_eq!(input.resolve_client_name(), "Acme Ltd");
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn not_found_routes_to_notes_then_final() {
        let policy = GuardrailPolicy::default();

        match policy.before_turn(&progress(ProfileState::NotFound, &[]), "Ghost Corp") {
            GuardrailDecision::Redirect { tool, input, .. } => {
                assert_eq!(tool, ToolName::NotesSearch);
                assert_eq!(input.extract_opt_string("query").as_deref(), Some("Ghost Corp"));
            }
            other => panic!("expected notes redirect, got {other:?}"),
        }

        assert_eq!(
            policy.before_turn(
                &progress(ProfileState::NotFound, &[ToolName::NotesSearch]),
                "Ghost Corp"
            ),
            GuardrailDecision::ForceFinal { reason_code: "client_not_found" }
        );
    }

    #[test]
    fn two_data_sources_after_resolution_force_final() {
        let policy = GuardrailPolicy::default();

        let one = progress(ProfileState::Resolved, &[ToolName::KpiSnapshot]);
        assert_eq!(policy.before_turn(&one, "Acme Ltd"), GuardrailDecision::Allow);

        let two = progress(ProfileState::Resolved, &[ToolName::KpiSnapshot, ToolName::OpenTickets]);
        assert_eq!(
            policy.before_turn(&two, "Acme Ltd"),
            GuardrailDecision::ForceFinal { reason_code: "enough_context" }
        );
    }

    #[test]
    fn unknown_tool_names_are_left_to_the_registry() {
        let policy = GuardrailPolicy::default();
        assert_eq!(
            policy.review_action(&progress(ProfileState::Unresolved, &[]), None, "Acme Ltd"),
            GuardrailDecision::Allow
        );
    }

    #[test]
    fn failed_data_tools_do_not_count_toward_early_stop() {
        let policy = GuardrailPolicy::default();
        let mut state = progress(ProfileState::Resolved, &[ToolName::ClientOverview]);
        state.failed.extend([ToolName::KpiSnapshot, ToolName::OpenTickets]);

        assert_eq!(state.data_sources_observed(), 0);
        assert_eq!(policy.before_turn(&state, "Acme Ltd"), GuardrailDecision::Allow);
    }

    #[test]
    fn failed_lookups_are_not_retried_by_redirects() {
        let policy = GuardrailPolicy::default();

        let mut unresolved = progress(ProfileState::Unresolved, &[]);
        unresolved.failed.insert(ToolName::ClientOverview);
        assert_eq!(
            policy.review_action(&unresolved, Some(ToolName::KpiSnapshot), "Acme Ltd"),
            GuardrailDecision::Allow
        );

        let mut missing = progress(ProfileState::NotFound, &[ToolName::ClientOverview]);
        missing.failed.insert(ToolName::NotesSearch);
        assert_eq!(
            policy.before_turn(&missing, "Ghost Corp"),
            GuardrailDecision::ForceFinal { reason_code: "client_not_found" }
        );
    }
}
