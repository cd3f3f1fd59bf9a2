pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;

use precall_agent::BriefKind;
use precall_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "precall",
    about = "Pre-call brief operator CLI",
    long_about = "Generate pre-call client briefs and operate the account database and note index.",
    after_help = "Examples:\n  precall seed\n  precall index\n  precall brief \"Acme Ltd\"\n  precall doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Full,
    TalkingPoints,
}

impl From<KindArg> for BriefKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Full => BriefKind::Full,
            KindArg::TalkingPoints => BriefKind::TalkingPointsOnly,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate a brief for one client, or list known clients with --list")]
    Brief {
        #[arg(help = "Company name as stored in the account database")]
        client: Option<String>,
        #[arg(long, help = "List known clients instead of generating a brief")]
        list: bool,
        #[arg(long, value_enum, default_value = "full", help = "Which brief to produce")]
        kind: KindArg,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo accounts and sample meeting notes")]
    Seed,
    #[command(about = "Chunk and embed meeting notes into the on-disk note index")]
    Index,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, model credentials, DB connectivity and the note index")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Brief { client, list, kind, json } => {
            commands::brief::run(&commands::brief::BriefArgs {
                client,
                list,
                kind: kind.into(),
                json,
            })
        }
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Index => commands::index::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command payloads on stdout stay parseable. Falls back to
/// defaults when configuration does not load; the command itself reports that error.
fn init_logging() {
    let (level, format) = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("warn".to_string(), LogFormat::Compact),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
