//! # List Command Implementation
//!
//! Prints the path of every subproject, one per line, relative to the
//! toplevel directory. This is a plumbing command: the output is stable.

use anyhow::Result;

use subpatch::exit_codes;
use subpatch::settings::Settings;
use subpatch::superproject::SuperprojectConfig;

use super::current_superproject;

/// Execute the `list` command.
pub fn execute(_settings: &Settings) -> Result<u8> {
    let (superx, super_paths) = current_superproject()?;
    superx.ensure_configured()?;

    let config = SuperprojectConfig::read(&super_paths.config_abspath)?;
    for path in &config.subprojects {
        println!("{}", path);
    }
    Ok(exit_codes::SUCCESS)
}
