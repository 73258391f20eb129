//! # Configure Command Implementation
//!
//! Creates the empty `.subpatch` file at the toplevel of a git repository and
//! stages it. Running it in an already configured superproject is not an
//! error.

use anyhow::Result;
use clap::Args;
use std::env;

use subpatch::error::Error;
use subpatch::exit_codes;
use subpatch::scm::{self, Backend};
use subpatch::settings::Settings;
use subpatch::superproject::{check_superproject_data, find_superproject};

/// Configure the superproject to use subpatch
#[derive(Args, Debug)]
pub struct ConfigureArgs {}

/// Execute the `configure` command.
pub fn execute(_args: ConfigureArgs, settings: &Settings) -> Result<u8> {
    let cwd = env::current_dir()?;

    let Some(superx) = check_superproject_data(&find_superproject(&cwd))? else {
        return Err(Error::not_implemented_yet(
            "No SCM found. Cannot configure. '--here' not implemented yet!",
        )
        .into());
    };

    if superx.configured {
        if !settings.quiet {
            println!("The file .subpatch already exists. Nothing to do!");
        }
        return Ok(exit_codes::SUCCESS);
    }

    if superx.backend != Backend::Git {
        return Err(Error::not_implemented_yet(
            "SCM not supported. Currently subpatch only supports git",
        )
        .into());
    }

    scm::configure(&superx.path, superx.helper().as_ref())?;

    if !settings.quiet {
        println!("The file .subpatch was created in the toplevel directory.");
        println!("Now use 'git commit' to finalized your change.");
    }
    Ok(exit_codes::SUCCESS)
}
