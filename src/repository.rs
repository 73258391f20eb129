//! # Upstream Acquisition
//!
//! This module turns a repository URL and an optional revision into a plain
//! file tree on disk plus the object id that was integrated.
//!
//! ## Strategy
//!
//! The requested revision decides how the upstream repository is fetched,
//! see [`resolve_clone_config`]:
//!
//! - **No revision**: full clone of the default branch. The object id is read
//!   back from `HEAD` of the clone.
//! - **A full SHA1**: full clone, since a single arbitrary commit generally
//!   cannot be fetched in isolation. The id must name a commit or a tag.
//! - **Anything else**: a branch or tag name. It is resolved against the
//!   remote ref listing and only that ref is fetched, shallow by default.
//!
//! After checkout the `.git` directory is removed so only the tree remains.
//!
//! ## Design
//!
//! All git access goes through the [`GitOperations`] trait. The
//! [`Downloader`] uses [`DefaultGitOperations`] in the application and mock
//! implementations in tests.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::git::{self, ObjectType};
use crate::url::{url_type, UrlType};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// List the refs of the remote repository, as `ref name -> object id`.
    fn ls_remote(&self, dir: &Path, url: &OsStr) -> Result<BTreeMap<String, String>>;

    /// Full clone of `url` into `folder`.
    fn clone(&self, dir: &Path, url: &OsStr, folder: &Path) -> Result<()>;

    /// Initialize a repository in `folder` and fetch a single ref into it.
    ///
    /// Returns the object id of the fetched head.
    fn init_and_fetch(&self, folder: &Path, url: &OsStr, reference: &str, shallow: bool) -> Result<String>;

    fn verify(&self, folder: &Path, object_id: &str) -> Result<bool>;

    fn object_type(&self, folder: &Path, object_id: &str) -> Result<ObjectType>;

    fn rev_parse(&self, folder: &Path, revision: &str) -> Result<String>;

    fn reset_hard(&self, folder: &Path, revision: &str) -> Result<()>;
}

/// The default implementation of `GitOperations`, which runs the system's
/// `git` binary.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn ls_remote(&self, dir: &Path, url: &OsStr) -> Result<BTreeMap<String, String>> {
        git::ls_remote(dir, url)
    }

    fn clone(&self, dir: &Path, url: &OsStr, folder: &Path) -> Result<()> {
        git::clone(dir, url, folder)
    }

    fn init_and_fetch(&self, folder: &Path, url: &OsStr, reference: &str, shallow: bool) -> Result<String> {
        git::init_and_fetch(folder, url, reference, shallow)
    }

    fn verify(&self, folder: &Path, object_id: &str) -> Result<bool> {
        git::verify(folder, object_id)
    }

    fn object_type(&self, folder: &Path, object_id: &str) -> Result<ObjectType> {
        git::object_type(folder, object_id)
    }

    fn rev_parse(&self, folder: &Path, revision: &str) -> Result<String> {
        git::rev_parse(folder, revision)
    }

    fn reset_hard(&self, folder: &Path, revision: &str) -> Result<()> {
        git::reset_hard(folder, revision)
    }
}

/// How an upstream repository is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneConfig {
    /// Clone everything. With an object id, check it out afterwards.
    FullClone { object_id: Option<String> },
    /// Fetch only the given fully qualified ref.
    FetchRef { reference: String },
}

/// Decide how to fetch `revision` from `url`.
///
/// Only a branch or tag name requires a network round trip, to look up the
/// remote refs.
pub fn resolve_clone_config(
    git_ops: &dyn GitOperations,
    dir: &Path,
    url: &OsStr,
    revision: Option<&str>,
) -> Result<CloneConfig> {
    let Some(revision) = revision else {
        return Ok(CloneConfig::FullClone { object_id: None });
    };

    if git::is_sha1(revision.as_bytes()) {
        return Ok(CloneConfig::FullClone {
            object_id: Some(revision.to_string()),
        });
    }

    let refs = git_ops.ls_remote(dir, url)?;
    match git::guess_remote_ref(&refs, revision) {
        Some(reference) => Ok(CloneConfig::FetchRef { reference }),
        None => Err(Error::invalid_argument(format!(
            "The reference '{}' cannot be resolved to a branch or tag!",
            revision
        ))),
    }
}

/// The URL as seen from inside the download folder.
///
/// The fetch runs in a directory other than `dir`, so a relative local path
/// is resolved against `dir` first.
fn fetch_url(dir: &Path, url: &OsStr) -> OsString {
    match url_type(&url.to_string_lossy()) {
        Ok(UrlType::LocalRelative) => dir.join(url).into_os_string(),
        _ => url.to_os_string(),
    }
}

/// Printable form of an optional revision.
pub fn revision_display(revision: Option<&str>) -> &str {
    revision.unwrap_or("HEAD")
}

/// Downloads upstream trees.
pub struct Downloader {
    git_ops: Box<dyn GitOperations>,
    shallow_fetch: bool,
}

impl Downloader {
    /// Creates a new `Downloader` that runs the system's `git` binary.
    pub fn new(shallow_fetch: bool) -> Self {
        Self {
            git_ops: Box::new(DefaultGitOperations),
            shallow_fetch,
        }
    }

    /// Creates a `Downloader` with a custom `GitOperations` implementation.
    ///
    /// This is primarily used for testing to inject mock operations.
    #[cfg(test)]
    pub fn with_operations(git_ops: Box<dyn GitOperations>, shallow_fetch: bool) -> Self {
        Self {
            git_ops,
            shallow_fetch,
        }
    }

    /// Download `revision` of `url` into the new directory `folder` and
    /// return the integrated object id.
    ///
    /// `dir` is the directory git is run in while cloning. `folder` must not
    /// exist yet. On failure it is removed again. On success it contains
    /// the plain tree without the `.git` directory.
    pub fn download(&self, dir: &Path, url: &OsStr, revision: Option<&str>, folder: &Path) -> Result<String> {
        let clone_config = resolve_clone_config(self.git_ops.as_ref(), dir, url, revision)?;
        info!("Downloading {:?} into {} with {:?}", url, folder.display(), clone_config);

        match self.checkout(dir, url, &clone_config, folder) {
            Ok(object_id) => {
                fs::remove_dir_all(folder.join(".git"))?;
                Ok(object_id)
            }
            Err(e) => {
                if folder.exists() {
                    if let Err(cleanup) = fs::remove_dir_all(folder) {
                        warn!("Cannot remove download directory {}: {}", folder.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    fn checkout(&self, dir: &Path, url: &OsStr, clone_config: &CloneConfig, folder: &Path) -> Result<String> {
        match clone_config {
            CloneConfig::FullClone { object_id: None } => {
                self.git_ops.clone(dir, url, folder)?;
                self.git_ops.rev_parse(folder, "HEAD")
            }
            CloneConfig::FullClone {
                object_id: Some(object_id),
            } => {
                self.git_ops.clone(dir, url, folder)?;
                if !self.git_ops.verify(folder, object_id)? {
                    return Err(Error::invalid_argument(format!(
                        "Object id '{}' does not point to a valid object!",
                        object_id
                    )));
                }
                let object_type = self.git_ops.object_type(folder, object_id)?;
                debug!("Object {} has type {:?}", object_id, object_type);
                if !matches!(object_type, ObjectType::Commit | ObjectType::Tag) {
                    return Err(Error::invalid_argument(format!(
                        "Object id '{}' does not point to a commit or tag object!",
                        object_id
                    )));
                }
                self.git_ops.reset_hard(folder, object_id)?;
                Ok(object_id.clone())
            }
            CloneConfig::FetchRef { reference } => {
                fs::create_dir_all(folder)?;
                let url = fetch_url(dir, url);
                let object_id = self
                    .git_ops
                    .init_and_fetch(folder, &url, reference, self.shallow_fetch)?;
                self.git_ops.reset_hard(folder, &object_id)?;
                Ok(object_id)
            }
        }
    }
}
