//! Grammar for one model turn in the ReAct transcript format:
//!
//! ```text
//! Thought: <free text>
//! Action: <tool name>
//! Action Input: <client name or JSON object>
//! ```
//!
//! or
//!
//! ```text
//! Thought: I now know the final answer
//! Final Answer: <brief>
//! ```

use thiserror::Error;

use crate::normalize::{ActionInput, CallArgs};

const FINAL_ANSWER: &str = "Final Answer:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const OBSERVATION: &str = "Observation:";
const THOUGHT: &str = "Thought:";

#[derive(Clone, Debug, PartialEq)]
pub struct ProposedAction {
    pub thought: String,
    pub tool: String,
    pub input: ActionInput,
    /// Model text for this turn, replayed verbatim in the scratchpad.
    pub log: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParsedTurn {
    Action(ProposedAction),
    Final { thought: String, answer: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReactParseError {
    #[error("Invalid Format: Missing 'Action:' after 'Thought:'")]
    MissingAction,
    #[error("Invalid Format: Missing 'Action Input:' after 'Action:'")]
    MissingActionInput,
    #[error("Parsing LLM output produced both a final answer and a parse-able action")]
    FinalAnswerAndAction,
    #[error("Invalid Format: empty response")]
    Empty,
}

impl ReactParseError {
    /// Observation fed back to the model after a malformed turn.
    pub fn corrective_instruction(&self) -> String {
        format!(
            "{self}. Reply with exactly one `Action:` line naming a tool and one \
             `Action Input:` line holding the client name or a JSON object such as \
             {{\"client_name\": \"...\"}}, or give the `Final Answer:`."
        )
    }
}

/// One think/act/observe tuple from a run.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentStep {
    pub thought: String,
    pub tool: String,
    pub args: Option<CallArgs>,
    pub log: String,
    pub observation: String,
}

impl AgentStep {
    pub fn scratchpad_entry(&self) -> String {
        format!("{}\n{OBSERVATION} {}\n{THOUGHT} ", self.log.trim_end(), self.observation)
    }
}

pub fn parse_step(completion: &str) -> Result<ParsedTurn, ReactParseError> {
    let text = strip_hallucinated_observation(completion.trim());
    if text.is_empty() {
        return Err(ReactParseError::Empty);
    }

    let final_at = text.find(FINAL_ANSWER);
    let action_at = find_line_prefix(text, ACTION);
    let input_at = action_at.and_then(|at| {
        find_line_prefix(&text[at..], ACTION_INPUT).map(|offset| at + offset)
    });

    match (action_at, input_at, final_at) {
        (Some(_), Some(_), Some(_)) => Err(ReactParseError::FinalAnswerAndAction),
        (Some(action_at), Some(input_at), None) => {
            let tool_line = text[action_at + ACTION.len()..].lines().next().unwrap_or_default();
            let tool = clean_tool_name(tool_line);
            if tool.is_empty() {
                return Err(ReactParseError::MissingAction);
            }
            let raw_input = clean_input(&text[input_at + ACTION_INPUT.len()..]);
            if raw_input.is_empty() {
                return Err(ReactParseError::MissingActionInput);
            }
            Ok(ParsedTurn::Action(ProposedAction {
                thought: clean_thought(&text[..action_at]),
                tool,
                input: ActionInput::from_raw(&raw_input),
                log: text.to_string(),
            }))
        }
        (_, _, Some(final_at)) => Ok(ParsedTurn::Final {
            thought: clean_thought(&text[..final_at]),
            answer: text[final_at + FINAL_ANSWER.len()..].trim().to_string(),
        }),
        (Some(_), None, None) => Err(ReactParseError::MissingActionInput),
        (None, _, None) => Err(ReactParseError::MissingAction),
    }
}

/// Reads a completion produced after the prompt was primed with `Final Answer:`.
pub fn parse_forced_final(completion: &str) -> String {
    let text = strip_hallucinated_observation(completion.trim());
    let text = match text.find(FINAL_ANSWER) {
        Some(at) => &text[at + FINAL_ANSWER.len()..],
        None => text,
    };
    let text = match find_line_prefix(text, ACTION) {
        Some(at) => &text[..at],
        None => text,
    };
    text.trim().to_string()
}

/// Byte offset of the first line whose trimmed start is `prefix`.
fn find_line_prefix(text: &str, prefix: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line.trim_start().starts_with(prefix) {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

fn strip_hallucinated_observation(text: &str) -> &str {
    match find_line_prefix(text, OBSERVATION) {
        Some(at) => text[..at].trim_end(),
        None => text,
    }
}

fn clean_thought(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix(THOUGHT).unwrap_or(text).trim().to_string()
}

fn clean_tool_name(line: &str) -> String {
    line.trim().trim_matches(|ch| ch == '`' || ch == '"' || ch == '\'').trim().to_string()
}

fn clean_input(text: &str) -> String {
    let mut input = text.trim();
    if let Some(fenced) = input.strip_prefix("```") {
        let fenced = fenced.strip_prefix("json").unwrap_or(fenced);
        input = fenced.strip_suffix("```").unwrap_or(fenced).trim();
    }
    let input = input.trim();
    if input.len() >= 2 && input.starts_with('"') && input.ends_with('"') {
        return input[1..input.len() - 1].trim().to_string();
    }
    input.to_string()
}
