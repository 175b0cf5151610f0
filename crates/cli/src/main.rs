use std::process::ExitCode;

fn main() -> ExitCode {
    boardwatch_cli::run()
}
