//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `subpatch` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the run-time
//!   `Settings`, performs the command's logic and returns the exit code.
//!
//! The lookups that most commands start with are shared in this module.

pub mod add;
pub mod apply;
pub mod configure;
pub mod list;
pub mod pop;
pub mod push;
pub mod status;
pub mod subtree;
pub mod sync;
pub mod update;

use std::env;
use std::path::Path;

use subpatch::error::{Error, Result};
use subpatch::paths::{subproject_containing, SubPaths, SuperPaths};
use subpatch::superproject::{Superproject, SuperprojectConfig};

/// The superproject containing the current work directory.
pub(crate) fn current_superproject() -> Result<(Superproject, SuperPaths)> {
    let cwd = env::current_dir()?;
    let superx = Superproject::discover(&cwd)?;
    let super_paths = SuperPaths::new(&superx.path, &cwd)?;
    Ok((superx, super_paths))
}

/// Like [`current_superproject`], but the superproject must be configured
/// and use git.
pub(crate) fn configured_git_superproject() -> Result<(Superproject, SuperPaths)> {
    let (superx, super_paths) = current_superproject()?;
    superx.ensure_configured()?;
    superx.ensure_git()?;
    Ok((superx, super_paths))
}

/// The subproject the current work directory is the toplevel of.
pub(crate) fn current_subproject() -> Result<(Superproject, SuperPaths, SubPaths)> {
    let (superx, super_paths) = configured_git_superproject()?;
    let config = SuperprojectConfig::read(&super_paths.config_abspath)?;

    let super_to_sub_relpath = subproject_containing(&config.subprojects, &super_paths.super_to_cwd_relpath)
        .ok_or_else(|| Error::invalid_argument("Current work directory must be inside a subproject!"))?;

    if Path::new(super_to_sub_relpath) != super_paths.super_to_cwd_relpath {
        return Err(Error::invalid_argument(
            "Current work directory must be the toplevel directory of the subproject for now!",
        ));
    }

    let sub_paths = SubPaths::from_cwd_relpath(&super_paths, Path::new(""))?;
    Ok((superx, super_paths, sub_paths))
}
