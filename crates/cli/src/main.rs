use std::process::ExitCode;

fn main() -> ExitCode {
    precall_cli::run()
}
