use chronotidy::cli::{self, Cli};
use chronotidy::output::OutputFormatter;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            OutputFormatter::error(&message);
            ExitCode::FAILURE
        }
    }
}
