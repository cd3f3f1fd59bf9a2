//! Turns whatever the model wrote after `Action Input:` into typed tool arguments.
//!
//! The model may send a bare client name, a JSON object encoded as text, or (through the
//! API) an already structured value. All three collapse into [`ActionInput`] once, and
//! every field lookup goes through the same precedence rules. Nothing here fails: a
//! malformed input degrades to using the raw text as the client name.

use std::fmt;

use serde_json::{Map, Value};

use precall_core::config::AgentConfig;

use crate::tools::ToolName;

#[derive(Clone, Debug, PartialEq)]
pub enum ActionInput {
    RawText(String),
    JsonObject { raw: String, fields: Map<String, Value> },
}

impl ActionInput {
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(trimmed) {
                return Self::JsonObject { raw: trimmed.to_string(), fields };
            }
        }
        Self::RawText(trimmed.to_string())
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::from_raw(&text),
            Value::Object(fields) => {
                let raw = Value::Object(fields.clone()).to_string();
                Self::JsonObject { raw, fields }
            }
            other => Self::RawText(other.to_string()),
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Self::RawText(raw) | Self::JsonObject { raw, .. } => raw,
        }
    }

    fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Self::RawText(_) => None,
            Self::JsonObject { fields, .. } => fields.get(key),
        }
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
    }

    /// `client_name`, then `company_name`, then the raw input.
    pub fn resolve_client_name(&self) -> String {
        self.non_empty_str("client_name")
            .or_else(|| self.non_empty_str("company_name"))
            .unwrap_or_else(|| self.raw())
            .trim()
            .trim_matches('"')
            .to_string()
    }

    /// A positive integer field given as a JSON number or numeric string, else `default`.
    pub fn extract_u32(&self, key: &str, default: u32) -> u32 {
        let parsed = match self.field(key) {
            Some(Value::Number(number)) => number
                .as_u64()
                .or_else(|| number.as_f64().filter(|v| v.fract() == 0.0 && *v >= 0.0).map(|v| v as u64))
                .and_then(|value| u32::try_from(value).ok()),
            Some(Value::String(text)) => text.trim().parse::<u32>().ok(),
            _ => None,
        };
        parsed.filter(|value| *value > 0).unwrap_or(default)
    }

    pub fn extract_opt_string(&self, key: &str) -> Option<String> {
        self.non_empty_str(key).map(str::to_string)
    }
}

impl fmt::Display for ActionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

/// Defaults applied when the model omits a secondary parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolDefaults {
    pub kpi_months: u32,
    pub interaction_limit: u32,
    pub notes_k: u32,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self { kpi_months: 3, interaction_limit: 5, notes_k: 3 }
    }
}

impl From<&AgentConfig> for ToolDefaults {
    fn from(config: &AgentConfig) -> Self {
        Self {
            kpi_months: config.default_kpi_months,
            interaction_limit: config.default_interaction_limit,
            notes_k: config.default_notes_k,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallArgs {
    ClientOverview { client_name: String },
    KpiSnapshot { client_name: String, months: u32 },
    RecentInteractions { client_name: String, limit: u32 },
    OpenTickets { client_name: String, status: Option<String> },
    NotesSearch { query: String, k: u32, client_name: Option<String> },
}

impl CallArgs {
    pub fn normalize(tool: ToolName, input: &ActionInput, defaults: &ToolDefaults) -> Self {
        match tool {
            ToolName::ClientOverview => {
                Self::ClientOverview { client_name: input.resolve_client_name() }
            }
            ToolName::KpiSnapshot => Self::KpiSnapshot {
                client_name: input.resolve_client_name(),
                months: input.extract_u32("months", defaults.kpi_months),
            },
            ToolName::RecentInteractions => Self::RecentInteractions {
                client_name: input.resolve_client_name(),
                limit: input.extract_u32("limit", defaults.interaction_limit),
            },
            ToolName::OpenTickets => Self::OpenTickets {
                client_name: input.resolve_client_name(),
                status: input.extract_opt_string("status"),
            },
            ToolName::NotesSearch => {
                let client_name = input
                    .extract_opt_string("client_name")
                    .or_else(|| input.extract_opt_string("company_name"));
                let query = input
                    .extract_opt_string("query")
                    .or_else(|| client_name.clone())
                    .unwrap_or_else(|| input.resolve_client_name());
                Self::NotesSearch {
                    query,
                    k: input.extract_u32("k", defaults.notes_k),
                    client_name,
                }
            }
        }
    }

    pub fn tool(&self) -> ToolName {
        match self {
            Self::ClientOverview { .. } => ToolName::ClientOverview,
            Self::KpiSnapshot { .. } => ToolName::KpiSnapshot,
            Self::RecentInteractions { .. } => ToolName::RecentInteractions,
            Self::OpenTickets { .. } => ToolName::OpenTickets,
            Self::NotesSearch { .. } => ToolName::NotesSearch,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ActionInput, CallArgs, ToolDefaults};
    use crate::tools::ToolName;

    #[test]
    fn json_text_overrides_default_months() {
        let input = ActionInput::from_raw(r#"{"client_name": "Acme Ltd", "months": 6}"#);
        let args = CallArgs::normalize(ToolName::KpiSnapshot, &input, &ToolDefaults::default());

        assert_eq!(args, CallArgs::KpiSnapshot { client_name: "Acme Ltd".to_string(), months: 6 });
    }

    #[test]
    fn plain_text_is_the_client_name_with_defaults() {
        let input = ActionInput::from_raw("  Acme Ltd ");
        let args =
            CallArgs::normalize(ToolName::RecentInteractions, &input, &ToolDefaults::default());

        assert_eq!(
            args,
            CallArgs::RecentInteractions { client_name: "Acme Ltd".to_string(), limit: 5 }
        );
    }

    #[test]
    fn company_name_is_used_when_client_name_is_missing() {
        let input = ActionInput::from_raw(r#"{"company_name": "Globex Corporation"}"#);
        assert_eq!(input.resolve_client_name(), "Globex Corporation");

        let blank = ActionInput::from_raw(r#"{"client_name": " ", "company_name": "Initech"}"#);
        assert_eq!(blank.resolve_client_name(), "Initech");
    }

    #[test]
    fn malformed_json_degrades_to_raw_text() {
        let input = ActionInput::from_raw(r#"{"client_name": "Acme Ltd", "months": }"#);

        assert!(matches!(input, ActionInput::RawText(_)));
        assert_eq!(input.resolve_client_name(), r#"{"client_name": "Acme Ltd", "months": }"#);
        assert_eq!(input.extract_u32("months", 3), 3);
    }

    #[test]
    fn json_object_without_name_fields_falls_back_to_raw() {
        let input = ActionInput::from_raw(r#"{"months": 2}"#);
        assert_eq!(input.resolve_client_name(), r#"{"months": 2}"#);
    }

    #[test]
    fn numeric_strings_are_accepted_and_bad_values_use_defaults() {
        let input = ActionInput::from_value(json!({
            "client_name": "Acme Ltd",
            "months": "4",
            "limit": -2,
            "k": "many"
        }));

        assert_eq!(input.extract_u32("months", 3), 4);
        assert_eq!(input.extract_u32("limit", 5), 5);
        assert_eq!(input.extract_u32("k", 3), 3);
        assert_eq!(input.extract_u32("missing", 7), 7);
    }

    #[test]
    fn status_filter_is_optional() {
        let with_status = ActionInput::from_raw(r#"{"client_name": "Acme Ltd", "status": "Open"}"#);
        let without = ActionInput::from_raw("Acme Ltd");

        assert_eq!(
            CallArgs::normalize(ToolName::OpenTickets, &with_status, &ToolDefaults::default()),
            CallArgs::OpenTickets {
                client_name: "Acme Ltd".to_string(),
                status: Some("Open".to_string())
            }
        );
        assert_eq!(
            CallArgs::normalize(ToolName::OpenTickets, &without, &ToolDefaults::default()),
            CallArgs::OpenTickets { client_name: "Acme Ltd".to_string(), status: None }
        );
    }

    #[test]
    fn notes_query_prefers_query_then_client_name() {
        let defaults = ToolDefaults::default();
        let explicit = ActionInput::from_raw(r#"{"query": "renewal", "client_name": "Acme Ltd"}"#);
        let name_only = ActionInput::from_raw(r#"{"client_name": "Acme Ltd", "k": 2}"#);
        let raw = ActionInput::from_raw("Acme Ltd");

        assert_eq!(
            CallArgs::normalize(ToolName::NotesSearch, &explicit, &defaults),
            CallArgs::NotesSearch {
                query: "renewal".to_string(),
                k: 3,
                client_name: Some("Acme Ltd".to_string())
            }
        );
        assert_eq!(
            CallArgs::normalize(ToolName::NotesSearch, &name_only, &defaults),
            CallArgs::NotesSearch {
                query: "Acme Ltd".to_string(),
                k: 2,
                client_name: Some("Acme Ltd".to_string())
            }
        );
        assert_eq!(
            CallArgs::normalize(ToolName::NotesSearch, &raw, &defaults),
            CallArgs::NotesSearch { query: "Acme Ltd".to_string(), k: 3, client_name: None }
        );
    }

    #[test]
    fn structured_values_and_json_strings_are_equivalent() {
        let structured = ActionInput::from_value(json!({"client_name": "Acme Ltd", "months": 6}));
        let encoded = ActionInput::from_value(json!(r#"{"client_name": "Acme Ltd", "months": 6}"#));

        assert_eq!(structured.resolve_client_name(), encoded.resolve_client_name());
        assert_eq!(structured.extract_u32("months", 3), encoded.extract_u32("months", 3));
    }
}
