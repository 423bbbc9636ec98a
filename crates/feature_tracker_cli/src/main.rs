//! Binary entrypoint for the `feature-tracker` CLI.

use feature_tracker_cli::CliError;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = std::io::stdout().lock();
    match feature_tracker_cli::run(std::env::args_os(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        // Help and version requests also arrive here; clap picks the stream and code.
        Err(CliError::Args(err)) => err.exit(),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
