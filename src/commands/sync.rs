//! # Sync Command Implementation
//!
//! Rewrites the diff of the current patch from the staged changes of the
//! subtree. The header and the signature of the patch file are kept.

use anyhow::Result;

use subpatch::exit_codes;
use subpatch::settings::Settings;
use subpatch::stack::PatchStack;

use super::current_subproject;

/// Execute the `sync` command.
pub fn execute(settings: &Settings) -> Result<u8> {
    let (superx, _super_paths, sub_paths) = current_subproject()?;
    let helper = superx.helper();

    let stack = PatchStack::load(helper.as_ref(), &sub_paths)?;
    let patch = stack.sync()?;

    if !settings.quiet {
        println!("Syncing patch '{}' from stagging area.", patch);
    }
    Ok(exit_codes::SUCCESS)
}
