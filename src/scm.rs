//! # SCM Adapter
//!
//! The patch stack and the commands reach the version control system of the
//! superproject only through the [`SuperHelper`] trait. [`GitHelper`] runs
//! the `git` binary in the toplevel directory; [`PlainHelper`] is used for
//! superprojects without any version control.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::defaults::SUPERPROJECT_CONFIG_FILENAME;
use crate::error::{Error, Result};
use crate::git::{self, ApplyDirection};

/// The version control backend of a superproject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Git,
    /// A directory tree without version control.
    Plain,
}

impl Backend {
    /// The helper operating on the superproject at `toplevel`.
    pub fn helper(self, toplevel: &Path) -> Box<dyn SuperHelper> {
        match self {
            Backend::Git => Box::new(GitHelper::new(toplevel)),
            Backend::Plain => Box::new(PlainHelper),
        }
    }
}

/// Operations on the superproject that depend on its version control system.
///
/// All paths are relative to the toplevel directory of the superproject.
pub trait SuperHelper {
    /// Record `paths` in the staging area.
    fn add(&self, paths: &[PathBuf]) -> Result<()>;

    fn print_instructions_to_commit_and_inspect(&self) -> Result<()>;

    /// Content hash of the subtree at `super_to_sub_relpath`.
    ///
    /// Includes staged changes. The `patches` directory and the metadata
    /// file are not part of the hash.
    fn get_sha1_for_subtree(&self, super_to_sub_relpath: &Path) -> Result<String>;

    /// Diff of the staged subtree against its committed state, optionally as
    /// a diffstat. Excludes the `patches` directory and the metadata file.
    fn get_diff_for_subtree(&self, super_to_sub_relpath: &Path, stat: bool) -> Result<Vec<u8>>;

    /// Apply or revert `patches`, in the given order, to the subtree.
    ///
    /// With `check` nothing is modified and the result tells whether the
    /// patches would apply. Without it the result is always `true`.
    fn apply_patches(
        &self,
        super_to_sub_relpath: &Path,
        patches: &[PathBuf],
        direction: ApplyDirection,
        check: bool,
    ) -> Result<bool>;
}

/// Superproject backed by a git repository.
#[derive(Debug, Clone)]
pub struct GitHelper {
    toplevel: PathBuf,
}

impl GitHelper {
    pub fn new(toplevel: &Path) -> Self {
        Self {
            toplevel: toplevel.to_path_buf(),
        }
    }

    /// Hash of the committed subtree, with the same entries stripped as for
    /// [`SuperHelper::get_sha1_for_subtree`].
    fn get_head_sha1_for_subtree(&self, super_to_sub_relpath: &Path) -> Result<String> {
        let tree = format!("HEAD:{}", super_to_sub_relpath.display());
        git::strip_tree_object(&self.toplevel, &tree)
    }
}

impl SuperHelper for GitHelper {
    fn add(&self, paths: &[PathBuf]) -> Result<()> {
        git::add(&self.toplevel, paths)
    }

    fn print_instructions_to_commit_and_inspect(&self) -> Result<()> {
        let shortstat = git::diff_staged_shortstat(&self.toplevel)?;
        if shortstat.is_empty() {
            println!("Note: There are no changes in the subproject. Nothing to commit!");
        } else {
            println!("The following changes are recorded in the git index:");
            println!(" {}", shortstat);
            println!("- To inspect the changes, use `git status` and `git diff --staged`.");
            println!("- If you want to keep the changes, commit them with `git commit`.");
            println!("- If you want to revert the changes, execute `git reset --merge`.");
        }
        Ok(())
    }

    fn get_sha1_for_subtree(&self, super_to_sub_relpath: &Path) -> Result<String> {
        let tree = git::write_tree(&self.toplevel, super_to_sub_relpath)?;
        git::strip_tree_object(&self.toplevel, &tree)
    }

    fn get_diff_for_subtree(&self, super_to_sub_relpath: &Path, stat: bool) -> Result<Vec<u8>> {
        let staged = self.get_sha1_for_subtree(super_to_sub_relpath)?;
        let head = self.get_head_sha1_for_subtree(super_to_sub_relpath)?;
        debug!("Diffing subtree {} from {} to {}", super_to_sub_relpath.display(), head, staged);
        git::diff_trees(&self.toplevel, &head, &staged, stat)
    }

    fn apply_patches(
        &self,
        super_to_sub_relpath: &Path,
        patches: &[PathBuf],
        direction: ApplyDirection,
        check: bool,
    ) -> Result<bool> {
        if check {
            git::apply_check(&self.toplevel, super_to_sub_relpath, patches, direction)
        } else {
            git::apply(&self.toplevel, super_to_sub_relpath, patches, direction)?;
            Ok(true)
        }
    }
}

/// Superproject without version control.
///
/// There is no staging area, so `add` has nothing to do.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHelper;

impl SuperHelper for PlainHelper {
    fn add(&self, _paths: &[PathBuf]) -> Result<()> {
        Ok(())
    }

    fn print_instructions_to_commit_and_inspect(&self) -> Result<()> {
        Err(Error::not_implemented_yet(
            "Instructions for superprojects without SCM",
        ))
    }

    fn get_sha1_for_subtree(&self, _super_to_sub_relpath: &Path) -> Result<String> {
        Err(Error::not_implemented_yet(
            "Subtree checksums for superprojects without SCM",
        ))
    }

    fn get_diff_for_subtree(&self, _super_to_sub_relpath: &Path, _stat: bool) -> Result<Vec<u8>> {
        Err(Error::not_implemented_yet(
            "Subtree diffs for superprojects without SCM",
        ))
    }

    fn apply_patches(
        &self,
        _super_to_sub_relpath: &Path,
        _patches: &[PathBuf],
        _direction: ApplyDirection,
        _check: bool,
    ) -> Result<bool> {
        Err(Error::not_implemented_yet(
            "Applying patches in superprojects without SCM",
        ))
    }
}

/// Create an empty `.subpatch` file in `toplevel` and stage it.
pub fn configure(toplevel: &Path, helper: &dyn SuperHelper) -> Result<()> {
    let config_abspath = toplevel.join(SUPERPROJECT_CONFIG_FILENAME);
    if config_abspath.exists() {
        return Err(Error::invalid_state(format!(
            "The file '{}' already exists!",
            config_abspath.display()
        )));
    }
    fs::write(&config_abspath, b"")?;
    helper.add(&[PathBuf::from(SUPERPROJECT_CONFIG_FILENAME)])
}
