pub mod brief;
pub mod config;
pub mod doctor;
pub mod index;
pub mod migrate;
pub mod seed;

use std::sync::Arc;

use serde::Serialize;

use precall_core::config::{AppConfig, LoadOptions, RetrievalConfig};
use precall_retrieval::{
    Embedder, HashingEmbedder, NoteIndex, NoteSearch, NotesRetriever, RetrievalError,
};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

/// A failed step inside a command: error class, message, exit code.
pub(crate) type StepFailure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn plain(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) fn embedder(config: &RetrievalConfig) -> Arc<dyn Embedder> {
    Arc::new(HashingEmbedder::new(config.embedding_dimensions))
}

/// The persisted index when present; otherwise an in-memory index over `notes_dir`, or
/// an empty one when there are no notes either.
pub(crate) async fn open_notes(
    config: &RetrievalConfig,
) -> Result<Arc<dyn NoteSearch>, RetrievalError> {
    let embedder = embedder(config);
    if config.index_path.exists() {
        return Ok(Arc::new(NotesRetriever::open(&config.index_path, embedder).await?));
    }

    let index = if config.notes_dir.is_dir() {
        NoteIndex::build(
            &config.notes_dir,
            embedder.as_ref(),
            config.chunk_size,
            config.chunk_overlap,
        )
        .await?
    } else {
        NoteIndex::new(embedder.dimensions())
    };
    tracing::warn!(
        event_name = "cli.notes.index_missing",
        index_path = %config.index_path.display(),
        chunks = index.len(),
        "note index not found; using an in-memory index"
    );
    Ok(Arc::new(NotesRetriever::new(index, embedder)?))
}
