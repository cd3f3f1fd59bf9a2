use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use precall_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = match &config.llm.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => "<redacted>",
        Some(_) => "<empty>",
        None => "<unset>",
    };

    vec![
        Field {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["PRECALL_DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["PRECALL_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["PRECALL_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "llm.provider",
            value: format!("{:?}", config.llm.provider),
            env_keys: &["PRECALL_LLM_PROVIDER"],
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["PRECALL_LLM_MODEL", "GROQ_MODEL"],
        },
        Field {
            key: "llm.base_url",
            value: config.llm.effective_base_url().to_string(),
            env_keys: &["PRECALL_LLM_BASE_URL"],
        },
        Field {
            key: "llm.api_key",
            value: api_key.to_string(),
            env_keys: &["PRECALL_LLM_API_KEY", "GROQ_API_KEY"],
        },
        Field {
            key: "llm.temperature",
            value: config.llm.temperature.to_string(),
            env_keys: &["PRECALL_LLM_TEMPERATURE"],
        },
        Field {
            key: "retrieval.index_path",
            value: config.retrieval.index_path.display().to_string(),
            env_keys: &["PRECALL_RETRIEVAL_INDEX_PATH"],
        },
        Field {
            key: "retrieval.notes_dir",
            value: config.retrieval.notes_dir.display().to_string(),
            env_keys: &["PRECALL_RETRIEVAL_NOTES_DIR"],
        },
        Field {
            key: "agent.max_iterations",
            value: config.agent.max_iterations.to_string(),
            env_keys: &["PRECALL_AGENT_MAX_ITERATIONS"],
        },
        Field {
            key: "agent.max_execution_secs",
            value: config.agent.max_execution_secs.to_string(),
            env_keys: &["PRECALL_AGENT_MAX_EXECUTION_SECS"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["PRECALL_LOGGING_LEVEL", "PRECALL_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["PRECALL_LOGGING_FORMAT", "PRECALL_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["precall.toml", "config/precall.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
