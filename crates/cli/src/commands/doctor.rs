use precall_core::config::{AppConfig, LoadOptions};
use precall_db::{connect_with_config, AccountRepository, SqlAccountRepository};
use precall_retrieval::NoteIndex;
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_llm_credentials(&config));
            checks.push(check_database(&config));
            checks.push(check_note_index(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["llm_credentials", "database_connectivity", "note_index"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let has_key =
        config.llm.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty());
    let endpoint = config.llm.effective_base_url();

    if config.llm.provider.requires_api_key() && !has_key {
        DoctorCheck::new(
            "llm_credentials",
            CheckStatus::Fail,
            format!("{:?} requires an api key", config.llm.provider),
        )
    } else {
        DoctorCheck::new(
            "llm_credentials",
            CheckStatus::Pass,
            format!("{:?} model `{}` at {endpoint}", config.llm.provider, config.llm.model),
        )
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        // Missing tables are reported as a hint, not a connectivity failure.
        let clients = SqlAccountRepository::new(pool.clone()).list_clients(1_000).await.ok();
        pool.close().await;
        Ok::<Option<usize>, String>(clients.map(|clients| clients.len()))
    });

    match result {
        Ok(Some(count)) => DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}` ({count} clients)", config.database.url),
        ),
        Ok(None) => DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!(
                "connected using `{}` (schema missing; run `precall migrate`)",
                config.database.url
            ),
        ),
        Err(error) => DoctorCheck::new("database_connectivity", CheckStatus::Fail, error),
    }
}

fn check_note_index(config: &AppConfig) -> DoctorCheck {
    let path = &config.retrieval.index_path;
    if !path.exists() {
        return DoctorCheck::new(
            "note_index",
            CheckStatus::Fail,
            format!("no index at {}; run `precall index`", path.display()),
        );
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::new(
                "note_index",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    match runtime.block_on(NoteIndex::load(path)) {
        Ok(index) if index.dimensions != config.retrieval.embedding_dimensions => DoctorCheck::new(
            "note_index",
            CheckStatus::Fail,
            format!(
                "index has {} dimensions but retrieval.embedding_dimensions is {}; rebuild it",
                index.dimensions, config.retrieval.embedding_dimensions
            ),
        ),
        Ok(index) => DoctorCheck::new(
            "note_index",
            CheckStatus::Pass,
            format!("{} chunks in {}", index.len(), path.display()),
        ),
        Err(error) => DoctorCheck::new("note_index", CheckStatus::Fail, error.to_string()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
