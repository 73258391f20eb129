//! # Update Command Implementation
//!
//! This module implements the `update` subcommand, which replaces the subtree
//! of an existing subproject with a newer upstream revision.
//!
//! ## Functionality
//!
//! - **URL and revision**: default to the values in the metadata. Passing
//!   `--url` or `--revision` switches the subproject to a new origin.
//! - **Preconditions**: the subproject must not have unstaged changes and
//!   all of its patches must be popped. Staged changes are fine.
//! - **Replacing the subtree**: every tracked file of the old subtree is
//!   removed from the index and the working tree, then the downloaded files
//!   are moved in and staged. The `patches` directory and the metadata file
//!   stay untouched.
//! - **Metadata**: URL, revision, object id and the new subtree checksum are
//!   written to `.subproject`.

use anyhow::Result;
use clap::Args;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use subpatch::defaults::{DOWNLOAD_DIR_SUFFIX, METADATA_FILENAME, PATCHES_DIRNAME};
use subpatch::error::Error;
use subpatch::exit_codes;
use subpatch::git;
use subpatch::metadata::{self, ensure_dims_are_consistent, Metadata, PatchesDim, SubtreeDim, Upstream};
use subpatch::paths::{SubPaths, SuperPaths};
use subpatch::repository::{revision_display, Downloader};
use subpatch::scm::SuperHelper;
use subpatch::settings::Settings;
use subpatch::superproject::SuperprojectConfig;

use super::configured_git_superproject;

/// Fetch and update a subproject
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Path to the subproject
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// URL or path to the remote git repository
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Revision to integrate. Can be a branch name, tag name or commit id.
    #[arg(short, long, value_name = "REVISION")]
    pub revision: Option<String>,
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, settings: &Settings) -> Result<u8> {
    let Some(path) = args.path.as_deref() else {
        return Err(Error::not_implemented_yet("Must give path to subproject").into());
    };
    if let Some(revision) = &args.revision {
        if !git::is_valid_revision(revision) {
            return Err(Error::invalid_argument(format!("revision '{}' is invalid", revision)).into());
        }
    }

    let (superx, super_paths) = configured_git_superproject()?;
    let sub_paths = SubPaths::from_cwd_relpath(&super_paths, Path::new(path))?;

    let config = SuperprojectConfig::read(&super_paths.config_abspath)?;
    if !config.contains(&sub_paths.config_value()) {
        return Err(Error::invalid_argument(format!(
            "Path '{}' does not point to a subproject",
            sub_paths.super_to_sub_relpath.display()
        ))
        .into());
    }

    let metadata = Metadata::read(&sub_paths.metadata_abspath)?;
    let url = match args.url.or(metadata.url.clone()) {
        Some(url) => url,
        None => return Err(Error::invalid_state("No URL in the metadata found!").into()),
    };
    let revision = args.revision.or(metadata.revision.clone());

    // Staged changes are fine. Unstaged ones would be lost.
    let unstaged = git::diff_name_only(
        &super_paths.super_abspath,
        false,
        Some(sub_paths.super_to_sub_relpath.as_path()),
    )?;
    if !unstaged.is_empty() {
        return Err(Error::invalid_argument("There are unstaged changes in the subproject.").into());
    }

    let subtree = SubtreeDim::from_metadata(&metadata)?;
    let patches = PatchesDim::read(&sub_paths.patches_abspath)?;
    ensure_dims_are_consistent(&subtree, &patches)?;
    if !patches.is_empty() && subtree.effective_index(&patches) != -1 {
        return Err(Error::not_implemented_yet("subproject has patches applied. Please pop first!").into());
    }

    if !settings.quiet {
        print!(
            "Updating subproject '{}' from URL '{}' to revision '{}'...",
            sub_paths.cwd_to_sub_relpath.display(),
            url,
            revision_display(revision.as_deref())
        );
        io::stdout().flush()?;
    }

    let mut download_abspath = sub_paths.subproject_abspath.clone().into_os_string();
    download_abspath.push(DOWNLOAD_DIR_SUFFIX);
    let download_abspath = PathBuf::from(download_abspath);

    let helper = superx.helper();
    let result = Downloader::new(settings.shallow_fetch)
        .download(&super_paths.super_abspath, url.as_ref(), revision.as_deref(), &download_abspath)
        .and_then(|object_id| {
            let unpacked = unpack(helper.as_ref(), &super_paths, &sub_paths, &download_abspath);
            if download_abspath.exists() {
                if unpacked.is_err() {
                    eprintln!(
                        "Warning: Download directory '{}' still exists. Removing it!",
                        download_abspath.display()
                    );
                }
                fs::remove_dir_all(&download_abspath)?;
            }
            unpacked?;

            let checksum = helper.get_sha1_for_subtree(&sub_paths.super_to_sub_relpath)?;
            metadata::write_upstream(
                &sub_paths.metadata_abspath,
                &Upstream {
                    url: &url,
                    revision: revision.as_deref(),
                    object_id: &object_id,
                    checksum: Some(&checksum),
                },
            )?;
            helper.add(&[sub_paths.super_to_metadata_relpath()])
        });

    if !settings.quiet {
        println!("{}", if result.is_ok() { " Done." } else { " Failed." });
    }
    result?;

    if !settings.quiet {
        helper.print_instructions_to_commit_and_inspect()?;
    }
    Ok(exit_codes::SUCCESS)
}

/// Whether a path relative to the subproject belongs to the subtree.
fn is_subtree_path(sub_to_file_relpath: &str) -> bool {
    sub_to_file_relpath != METADATA_FILENAME
        && !Path::new(sub_to_file_relpath).starts_with(PATCHES_DIRNAME)
}

/// Swap the tracked subtree for the files in `download_abspath`.
///
/// Files are moved, so only empty directories and skipped entries are left
/// behind.
fn unpack(
    helper: &dyn SuperHelper,
    super_paths: &SuperPaths,
    sub_paths: &SubPaths,
    download_abspath: &Path,
) -> subpatch::error::Result<()> {
    let tracked: Vec<String> = git::ls_files(&sub_paths.subproject_abspath)?
        .into_iter()
        .filter(|path| is_subtree_path(path))
        .collect();
    debug!("Removing {} tracked files of {}", tracked.len(), sub_paths.super_to_sub_relpath.display());
    git::rm(&sub_paths.subproject_abspath, &tracked)?;

    fs::create_dir_all(&sub_paths.subproject_abspath)?;
    let mut added = Vec::new();
    for entry in WalkDir::new(download_abspath).min_depth(1) {
        let entry = entry.map_err(|e| Error::custom(format!("Cannot walk the download directory: {}", e)))?;
        let download_to_file_relpath = entry
            .path()
            .strip_prefix(download_abspath)
            .map_err(|_| Error::invalid_state("Walked outside of the download directory!"))?;
        let destination = sub_paths.subproject_abspath.join(download_to_file_relpath);

        if !is_subtree_path(&download_to_file_relpath.to_string_lossy()) {
            warn!("Skipping {} of the upstream tree", download_to_file_relpath.display());
            continue;
        }
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            fs::rename(entry.path(), &destination)?;
            added.push(sub_paths.super_to_sub_relpath.join(download_to_file_relpath));
        }
    }

    debug!("Adding {} files to {}", added.len(), super_paths.super_abspath.display());
    helper.add(&added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_subtree_path() {
        assert!(is_subtree_path("README.md"));
        assert!(is_subtree_path("src/patches.c"));
        assert!(is_subtree_path("patches.txt"));
        assert!(!is_subtree_path(".subproject"));
        assert!(!is_subtree_path("patches/0001-a.patch"));
    }
}
