use crate::commands::{embedder, load_config, runtime, CommandResult, StepFailure};
use precall_retrieval::NoteIndex;

pub fn run() -> CommandResult {
    let config = match load_config("index") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("index") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let retrieval = &config.retrieval;
    let result = runtime.block_on(async {
        let embedder = embedder(retrieval);
        let index = NoteIndex::build(
            &retrieval.notes_dir,
            embedder.as_ref(),
            retrieval.chunk_size,
            retrieval.chunk_overlap,
        )
        .await
        .map_err(|error| ("index_build", error.to_string(), 4u8))?;

        index
            .save(&retrieval.index_path)
            .await
            .map_err(|error| ("index_write", error.to_string(), 5u8))?;
        Ok::<NoteIndex, StepFailure>(index)
    });

    match result {
        Ok(index) => CommandResult::success(
            "index",
            format!(
                "indexed {} chunks from {} into {}",
                index.len(),
                retrieval.notes_dir.display(),
                retrieval.index_path.display()
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("index", error_class, message, exit_code)
        }
    }
}
