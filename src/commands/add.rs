//! # Add Command Implementation
//!
//! This module implements the `add` subcommand, which downloads a git
//! repository and integrates its tree as a new subproject.
//!
//! ## Functionality
//!
//! - **Subproject path**: defaults to the repository name derived from the
//!   URL. The path is relative to the current work directory.
//! - **Revision**: a branch, a tag or a full commit id. Without one the
//!   default branch of the remote is integrated.
//! - **Configuration**: an unconfigured git superproject is configured on
//!   the fly.
//!
//! Everything is staged but not committed. If a step fails, the staging area
//! shows what was done so far and `git reset --merge` reverts it.

use anyhow::Result;
use clap::Args;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use subpatch::defaults::{DOWNLOAD_DIR_SUFFIX, SUPERPROJECT_CONFIG_FILENAME};
use subpatch::error::Error;
use subpatch::exit_codes;
use subpatch::git;
use subpatch::metadata::{self, Upstream};
use subpatch::paths::{SubPaths, SuperPaths};
use subpatch::repository::{revision_display, Downloader};
use subpatch::scm::{self, SuperHelper};
use subpatch::settings::Settings;
use subpatch::superproject::add_subproject_to_config;
use subpatch::url::{name_from_repository_url, url_type, UrlType};

use super::current_superproject;

/// Fetch and add a subproject
#[derive(Args, Debug)]
pub struct AddArgs {
    /// URL or path to the git repository
    #[arg(value_name = "URL")]
    pub url: String,

    /// Folder of the subproject in the superproject
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Revision to integrate. Can be a branch name, tag name or commit id.
    #[arg(short, long, value_name = "REVISION")]
    pub revision: Option<String>,
}

/// Execute the `add` command.
pub fn execute(args: AddArgs, settings: &Settings) -> Result<u8> {
    if let Some(revision) = &args.revision {
        if !git::is_valid_revision(revision) {
            return Err(Error::invalid_argument(format!("revision '{}' is invalid", revision)).into());
        }
    }

    let cwd_to_sub_relpath = subproject_dirname(args.path.as_deref(), &args.url)?;
    let url_type = url_type(&args.url)?;

    let (superx, super_paths) = current_superproject()?;
    superx.ensure_git()?;
    let sub_paths = SubPaths::from_cwd_relpath(&super_paths, Path::new(&cwd_to_sub_relpath))?;

    match url_type {
        UrlType::LocalRelative if !super_paths.is_cwd_toplevel() => {
            return Err(Error::custom(
                "When using relative repository URLs, you current work directory \
                 must be the toplevel folder of the superproject!",
            )
            .into());
        }
        UrlType::LocalAbsolute => {
            return Err(Error::custom("Absolute local paths to a remote repository are not supported!").into());
        }
        _ => {}
    }

    let helper = superx.helper();
    if !superx.configured {
        scm::configure(&super_paths.super_abspath, helper.as_ref())?;
    }

    if sub_paths.subproject_abspath.exists() {
        return Err(Error::custom(format!(
            "Directory '{}' alreay exists. Cannot add subproject!",
            sub_paths.cwd_to_sub_relpath.display()
        ))
        .into());
    }

    // Reserve the subproject in the config and in the staging area first
    fs::create_dir_all(&sub_paths.subproject_abspath)?;
    fs::write(&sub_paths.metadata_abspath, b"")?;
    helper.add(&[sub_paths.super_to_metadata_relpath()])?;
    add_subproject_to_config(&super_paths.config_abspath, &sub_paths.config_value())?;
    helper.add(&[PathBuf::from(SUPERPROJECT_CONFIG_FILENAME)])?;

    if !settings.quiet {
        print!(
            "Adding subproject '{}' from URL '{}' at revision '{}'...",
            sub_paths.cwd_to_sub_relpath.display(),
            args.url,
            revision_display(args.revision.as_deref())
        );
        io::stdout().flush()?;
    }

    let result = download_and_unpack(
        helper.as_ref(),
        &super_paths,
        &sub_paths,
        &args.url,
        args.revision.as_deref(),
        settings,
    );
    if !settings.quiet {
        // Terminate the progress line even on failure
        println!("{}", if result.is_ok() { " Done." } else { " Failed." });
    }
    result?;

    if !settings.quiet {
        helper.print_instructions_to_commit_and_inspect()?;
    }
    Ok(exit_codes::SUCCESS)
}

/// The subproject folder relative to the current work directory.
fn subproject_dirname(path: Option<&str>, url: &str) -> subpatch::error::Result<String> {
    match path {
        Some("") => Err(Error::invalid_argument("path is empty")),
        Some(path) => {
            let trimmed = path.trim_end_matches('/');
            Ok(if trimmed.is_empty() { path.to_string() } else { trimmed.to_string() })
        }
        None => name_from_repository_url(url),
    }
}

fn download_and_unpack(
    helper: &dyn SuperHelper,
    super_paths: &SuperPaths,
    sub_paths: &SubPaths,
    url: &str,
    revision: Option<&str>,
    settings: &Settings,
) -> subpatch::error::Result<()> {
    let mut download_abspath = sub_paths.subproject_abspath.clone().into_os_string();
    download_abspath.push(DOWNLOAD_DIR_SUFFIX);
    let download_abspath = PathBuf::from(download_abspath);

    let downloader = Downloader::new(settings.shallow_fetch);
    let object_id = downloader.download(&super_paths.super_abspath, url.as_ref(), revision, &download_abspath)?;

    // Replace the placeholder directory by the downloaded tree
    fs::remove_file(&sub_paths.metadata_abspath)?;
    fs::remove_dir(&sub_paths.subproject_abspath)?;
    fs::rename(&download_abspath, &sub_paths.subproject_abspath)?;
    helper.add(&[sub_paths.super_to_sub_relpath.clone()])?;

    let checksum = helper.get_sha1_for_subtree(&sub_paths.super_to_sub_relpath)?;
    metadata::write_upstream(
        &sub_paths.metadata_abspath,
        &Upstream {
            url,
            revision,
            object_id: &object_id,
            checksum: Some(&checksum),
        },
    )?;
    helper.add(&[sub_paths.super_to_metadata_relpath()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subproject_dirname_from_url() {
        assert_eq!(subproject_dirname(None, "https://example.com/org/repo.git").unwrap(), "repo");
        assert_eq!(subproject_dirname(None, "../subproject").unwrap(), "subproject");
    }

    #[test]
    fn test_subproject_dirname_strips_trailing_slashes() {
        assert_eq!(subproject_dirname(Some("external/lib//"), "x").unwrap(), "external/lib");
    }

    #[test]
    fn test_subproject_dirname_empty_path() {
        let err = subproject_dirname(Some(""), "x").unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: path is empty");
    }
}
