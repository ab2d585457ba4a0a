//! Entry point for the `kiln` binary: parse arguments, set up logging and
//! colors, dispatch, and map the outcome to an exit code.

use std::process::ExitCode;

use clap::Parser;
use kiln_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with 1, keeping 2 for post-write failures.
    let args = match cli::Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init(args.no_color, args.quiet);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            eprintln!("{:?}", error::cli_error_to_miette(err));
            ExitCode::FAILURE
        }
    }
}
