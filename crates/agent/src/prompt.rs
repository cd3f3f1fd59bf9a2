use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

use precall_core::brief::BRIEF_WORD_LIMIT;

use crate::normalize::ToolDefaults;
use crate::react::AgentStep;

const SYSTEM_TEMPLATE: &str = "system.txt";
const REACT_TEMPLATE: &str = "react.txt";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template error: {0}")]
    Template(#[from] tera::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefKind {
    #[default]
    Full,
    TalkingPointsOnly,
}

impl BriefKind {
    pub fn question(self, client_name: &str) -> String {
        match self {
            Self::Full => format!(
                "Prepare a pre-call brief for {client_name}. Include only factual info from tools."
            ),
            Self::TalkingPointsOnly => format!(
                "Prepare a pre-call brief for {client_name}. Include only factual info from tools. \
                 Return ONLY the 'Talking points' section as 3-5 concise, professional bullets. \
                 Do not include Overview, KPIs, Risks, or References. Avoid repeating raw notes; \
                 synthesize next-step discussion items based on recent interactions, KPIs, and \
                 open tickets."
            ),
        }
    }
}

pub struct PromptInput<'a> {
    pub question: &'a str,
    pub tools: &'a str,
    pub tool_names: &'a str,
    pub steps: &'a [AgentStep],
    /// Primes the transcript with `Final Answer:` so the next completion is the answer.
    pub force_final: bool,
}

pub struct PromptBuilder {
    tera: Tera,
    system: String,
}

impl PromptBuilder {
    pub fn new(defaults: &ToolDefaults) -> Result<Self, PromptError> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            SYSTEM_TEMPLATE,
            include_str!("../../../templates/prompts/system.txt"),
        )?;
        tera.add_raw_template(REACT_TEMPLATE, include_str!("../../../templates/prompts/react.txt"))?;

        let mut context = Context::new();
        context.insert("word_limit", &BRIEF_WORD_LIMIT);
        context.insert("kpi_months", &defaults.kpi_months);
        context.insert("interaction_limit", &defaults.interaction_limit);
        context.insert("notes_k", &defaults.notes_k);
        let system = tera.render(SYSTEM_TEMPLATE, &context)?.trim_end().to_string();

        Ok(Self { tera, system })
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn render(&self, input: &PromptInput<'_>) -> Result<String, PromptError> {
        let scratchpad =
            input.steps.iter().map(AgentStep::scratchpad_entry).collect::<Vec<_>>().join("");

        let mut context = Context::new();
        context.insert("system", &self.system);
        context.insert("tools", input.tools);
        context.insert("tool_names", input.tool_names);
        context.insert("question", input.question);
        context.insert("scratchpad", &scratchpad);
        context.insert("force_final", &input.force_final);

        Ok(self.tera.render(REACT_TEMPLATE, &context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{BriefKind, PromptBuilder, PromptInput};
    use crate::normalize::ToolDefaults;
    use crate::react::AgentStep;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&ToolDefaults::default()).expect("templates")
    }

    #[test]
    fn system_prompt_carries_limits_and_defaults() {
        let builder = builder();
        assert!(builder.system().contains("under 150 words"));
        assert!(builder.system().contains("kpi_snapshot months=3"));
        assert!(builder.system().contains("recent_interactions limit=5"));
    }

    #[test]
    fn first_turn_ends_with_open_thought() {
        let prompt = builder()
            .render(&PromptInput {
                question: &BriefKind::Full.question("Acme Ltd"),
                tools: "client_overview(client_name: str) - Get a client's profile",
                tool_names: "client_overview",
                steps: &[],
                force_final: false,
            })
            .expect("render");

        assert!(prompt.contains("must be one of [client_overview]"));
        assert!(prompt.contains("Question: Prepare a pre-call brief for Acme Ltd."));
        assert!(prompt.ends_with("Thought: "));
        assert!(prompt.contains("Get a client's profile"), "tool text must not be escaped");
    }

    #[test]
    fn scratchpad_and_forced_final_are_appended() {
        let steps = vec![AgentStep {
            thought: String::new(),
            tool: "client_overview".to_string(),
            args: None,
            log: "Action: client_overview\nAction Input: Ghost Corp".to_string(),
            observation: "Not found".to_string(),
        }];
        let prompt = builder()
            .render(&PromptInput {
                question: "q",
                tools: "",
                tool_names: "",
                steps: &steps,
                force_final: true,
            })
            .expect("render");

        assert!(prompt.ends_with(
            "Action Input: Ghost Corp\nObservation: Not found\nThought: I now know the final answer\nFinal Answer: "
        ));
    }

    #[test]
    fn talking_points_question_excludes_other_sections() {
        let question = BriefKind::TalkingPointsOnly.question("Initech");
        assert!(question.contains("Return ONLY the 'Talking points' section"));
        assert!(question.contains("3-5 concise"));
    }
}
