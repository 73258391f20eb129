//! # subpatch CLI
//!
//! This is the binary entry point for the `subpatch` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Reporting every failure as a single `Error: ...` line on stderr and
//!   mapping it to the documented exit code.
//!
//! The core logic lives in the `subpatch` library crate. The binary is a
//! thin wrapper around it.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

use subpatch::error::Error;
use subpatch::exit_codes;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    match cli.execute() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(error) if error.is_already_reported() => {}
                Some(error) => eprintln!("Error: {}", error),
                None => eprintln!("Error: {:#}", e),
            }
            ExitCode::from(exit_codes::ERROR)
        }
    }
}
