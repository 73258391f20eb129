//! Apply command implementation
//!
//! Applies a new patch file to the subtree of the current subproject and
//! appends it to the patch stack. Must be run in the toplevel directory of
//! the subproject.

use anyhow::Result;
use clap::Args;
use std::path::{self, PathBuf};

use subpatch::error::Error;
use subpatch::exit_codes;
use subpatch::settings::Settings;
use subpatch::stack::PatchStack;

use super::current_subproject;

/// Arguments for the apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the patch file
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Execute the apply command
pub fn execute(args: ApplyArgs, settings: &Settings) -> Result<u8> {
    if !args.path.is_file() {
        return Err(Error::invalid_argument(format!(
            "Path '{}' must point to a file!",
            args.path.display()
        ))
        .into());
    }

    let (superx, _super_paths, sub_paths) = current_subproject()?;
    let helper = superx.helper();

    // git runs in the toplevel directory
    let patch_abspath = path::absolute(&args.path)?;
    let mut stack = PatchStack::load(helper.as_ref(), &sub_paths)?;
    stack.apply(&patch_abspath)?;

    if !settings.quiet {
        println!(
            "Applied patch '{}' to subproject '{}' successfully!",
            args.path.display(),
            sub_paths.super_to_sub_relpath.display()
        );
        helper.print_instructions_to_commit_and_inspect()?;
    }
    Ok(exit_codes::SUCCESS)
}
