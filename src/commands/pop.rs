//! # Pop Command Implementation
//!
//! Reverts the topmost applied patch of the current subproject, or with
//! `--all` every applied patch. The patch files stay in `patches/`.

use anyhow::Result;
use clap::Args;

use subpatch::exit_codes;
use subpatch::settings::Settings;
use subpatch::stack::PatchStack;

use super::current_subproject;

/// Remove the topmost patch from the subtree
#[derive(Args, Debug)]
pub struct PopArgs {
    /// Remove all applied patches
    #[arg(short, long)]
    pub all: bool,
}

/// Execute the `pop` command.
pub fn execute(args: PopArgs, settings: &Settings) -> Result<u8> {
    let (superx, _super_paths, sub_paths) = current_subproject()?;
    let helper = superx.helper();

    let mut stack = PatchStack::load(helper.as_ref(), &sub_paths)?;
    let popped = stack.pop(args.all)?;

    if !settings.quiet {
        for patch in &popped {
            println!(
                "Poped patch '{}' from subproject '{}' successfully!",
                patch,
                sub_paths.super_to_sub_relpath.display()
            );
        }
        helper.print_instructions_to_commit_and_inspect()?;
    }
    Ok(exit_codes::SUCCESS)
}
