use std::path::Path;

use crate::commands::{load_config, runtime, CommandResult, StepFailure};
use precall_db::{connect_with_config, migrations, DemoDataset, SeedResult, DEMO_NOTES};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
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

        let seed_result = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        pool.close().await;

        if !verification.all_present {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
                .collect::<Vec<_>>();
            return Err(("seed_verification", verification_message(&failed_checks), 6u8));
        }

        write_missing_notes(&config.retrieval.notes_dir)
            .await
            .map_err(|error| ("notes_write", error.to_string(), 7u8))?;

        Ok::<SeedResult, StepFailure>(seed_result)
    });

    match result {
        Ok(seeded) => CommandResult::success(
            "seed",
            summary_message(&seeded, &config.retrieval.notes_dir),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

/// Writes each sample note that is not already on disk; existing files are left alone.
async fn write_missing_notes(notes_dir: &Path) -> std::io::Result<usize> {
    tokio::fs::create_dir_all(notes_dir).await?;
    let mut written = 0;
    for note in DEMO_NOTES {
        let path = notes_dir.join(note.file_name);
        if tokio::fs::try_exists(&path).await? {
            continue;
        }
        tokio::fs::write(&path, note.body).await?;
        written += 1;
    }
    tracing::info!(
        event_name = "cli.seed.notes_written",
        notes_dir = %notes_dir.display(),
        written,
        "sample meeting notes written"
    );
    Ok(written)
}

fn summary_message(seeded: &SeedResult, notes_dir: &Path) -> String {
    let clients = seeded
        .clients_seeded
        .iter()
        .map(|client| format!("  - {client}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "demo dataset loaded for {} clients:\n{clients}\nmetrics: {}, interactions: {}, tickets: {}\nsample notes: {} in {}",
        seeded.clients_seeded.len(),
        seeded.metrics_seeded,
        seeded.interactions_seeded,
        seeded.tickets_seeded,
        DEMO_NOTES.len(),
        notes_dir.display()
    )
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
