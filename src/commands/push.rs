//! # Push Command Implementation
//!
//! Applies the next patch of the current subproject's stack, or with `--all`
//! every remaining one.

use anyhow::Result;
use clap::Args;

use subpatch::exit_codes;
use subpatch::settings::Settings;
use subpatch::stack::PatchStack;

use super::current_subproject;

/// Add the next patch to the subtree
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Apply all remaining patches
    #[arg(short, long)]
    pub all: bool,
}

/// Execute the `push` command.
pub fn execute(args: PushArgs, settings: &Settings) -> Result<u8> {
    let (superx, _super_paths, sub_paths) = current_subproject()?;
    let helper = superx.helper();

    let mut stack = PatchStack::load(helper.as_ref(), &sub_paths)?;
    let pushed = stack.push(args.all)?;

    if !settings.quiet {
        for patch in &pushed {
            println!(
                "Pushed patch '{}' to subproject '{}' successfully!",
                patch,
                sub_paths.super_to_sub_relpath.display()
            );
        }
        helper.print_instructions_to_commit_and_inspect()?;
    }
    Ok(exit_codes::SUCCESS)
}
