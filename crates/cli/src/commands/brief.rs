use std::sync::Arc;

use serde::Serialize;

use crate::commands::{load_config, open_notes, runtime, CommandResult, StepFailure};
use precall_agent::{BriefKind, BriefReport, BriefService, LlmClient, OpenAiCompatibleClient};
use precall_db::{connect_with_config, migrations, AccountRepository, SqlAccountRepository};

const LIST_LIMIT: u32 = 100;

#[derive(Clone, Debug)]
pub struct BriefArgs {
    pub client: Option<String>,
    pub list: bool,
    pub kind: BriefKind,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct BriefPayload<'a> {
    command: &'static str,
    status: &'static str,
    client: &'a str,
    kind: BriefKind,
    source: &'static str,
    stop_reason: &'static str,
    run_id: String,
    iterations: u32,
    tool_calls: usize,
    brief: &'a str,
}

enum BriefOutput {
    Clients(Vec<String>),
    Brief(BriefReport),
}

pub fn run(args: &BriefArgs) -> CommandResult {
    let client = args.client.as_deref().map(str::trim).filter(|client| !client.is_empty());
    if client.is_none() && !args.list {
        return CommandResult::failure(
            "brief",
            "usage",
            "a client name is required unless --list is given",
            64,
        );
    }

    let config = match load_config("brief") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("brief") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let repository: Arc<dyn AccountRepository> =
            Arc::new(SqlAccountRepository::new(pool.clone()));

        let output = match client {
            Some(client) if !args.list => {
                let notes = open_notes(&config.retrieval)
                    .await
                    .map_err(|error| ("note_index", error.to_string(), 6u8))?;
                let llm: Arc<dyn LlmClient> = Arc::new(
                    OpenAiCompatibleClient::from_config(&config.llm)
                        .map_err(|error| ("llm_config", error.to_string(), 2u8))?,
                );
                let service = BriefService::new(llm, repository, notes, &config.agent)
                    .map_err(|error| ("prompt_template", error.to_string(), 7u8))?;
                BriefOutput::Brief(service.generate_report(client, args.kind).await)
            }
            _ => {
                let clients = repository
                    .list_clients(LIST_LIMIT)
                    .await
                    .map_err(|error| ("db_query", error.to_string(), 5u8))?;
                BriefOutput::Clients(
                    clients
                        .into_iter()
                        .map(|profile| {
                            format!(
                                "{} ({}, {})",
                                profile.company_name, profile.industry, profile.region
                            )
                        })
                        .collect(),
                )
            }
        };

        pool.close().await;
        Ok::<BriefOutput, StepFailure>(output)
    });

    match result {
        Ok(BriefOutput::Clients(clients)) => {
            let message = if clients.is_empty() {
                "no clients found; run `precall seed` first".to_string()
            } else {
                clients.iter().map(|line| format!("- {line}")).collect::<Vec<_>>().join("\n")
            };
            if args.json {
                CommandResult::success("brief", message)
            } else {
                CommandResult::plain(message)
            }
        }
        Ok(BriefOutput::Brief(report)) => {
            let client = client.unwrap_or_default();
            if args.json {
                CommandResult::plain(render_payload(client, args.kind, &report))
            } else {
                CommandResult::plain(report.text)
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("brief", error_class, message, exit_code)
        }
    }
}

fn render_payload(client: &str, kind: BriefKind, report: &BriefReport) -> String {
    let payload = BriefPayload {
        command: "brief",
        status: "ok",
        client,
        kind,
        source: report.source.as_str(),
        stop_reason: report.stop_reason.as_str(),
        run_id: report.run_id.to_string(),
        iterations: report.iterations,
        tool_calls: report.tool_calls,
        brief: &report.text,
    };
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        CommandResult::failure("brief", "serialization", error.to_string(), 1).output
    })
}

#[cfg(test)]
mod tests {
    use precall_agent::{BriefKind, BriefReport, BriefSource, StopReason};
    use serde_json::Value;
    use uuid::Uuid;

    use super::render_payload;

    #[test]
    fn payload_carries_report_metadata() {
        let report = BriefReport {
            text: "Talking points: Confirm SSO rollout".to_string(),
            source: BriefSource::Fallback,
            run_id: Uuid::nil(),
            iterations: 10,
            tool_calls: 2,
            stop_reason: StopReason::IterationLimit,
        };

        let payload: Value =
            serde_json::from_str(&render_payload("Acme Ltd", BriefKind::TalkingPointsOnly, &report))
                .expect("json");

        assert_eq!(payload["command"], "brief");
        assert_eq!(payload["kind"], "talking_points_only");
        assert_eq!(payload["source"], "fallback");
        assert_eq!(payload["stop_reason"], "iteration_limit");
        assert_eq!(payload["brief"], "Talking points: Confirm SSO rollout");
    }
}
