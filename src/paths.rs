//! # Superproject and Subproject Paths
//!
//! Every command works with a handful of related paths. For a call from
//! `dirA` inside a superproject with a subproject at `dirA/dirB/subproject`:
//!
//! ```text
//! super_abspath:         /…/superproject
//! config_abspath:        /…/superproject/.subpatch
//! super_to_cwd_relpath:  dirA
//! super_to_sub_relpath:  dirA/dirB/subproject
//! cwd_to_sub_relpath:    dirB/subproject
//! sub_name:              subproject
//! ```
//!
//! All relative paths are lexically normalized: `.` components are removed
//! and `..` components cancel the preceding component. The empty path stands
//! for the directory itself. Symbolic links are not resolved.

use std::path::{Component, Path, PathBuf};

use crate::defaults::{METADATA_FILENAME, PATCHES_DIRNAME, SUPERPROJECT_CONFIG_FILENAME};
use crate::error::{Error, Result};

/// Paths of the superproject as seen from the current working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperPaths {
    pub super_abspath: PathBuf,
    pub config_abspath: PathBuf,
    pub super_to_cwd_relpath: PathBuf,
}

impl SuperPaths {
    /// `cwd` must be an absolute path inside `super_abspath`.
    pub fn new(super_abspath: &Path, cwd: &Path) -> Result<Self> {
        let super_to_cwd_relpath = cwd
            .strip_prefix(super_abspath)
            .map_err(|_| {
                Error::invalid_state(format!(
                    "Current work directory '{}' is not inside the superproject '{}'",
                    cwd.display(),
                    super_abspath.display()
                ))
            })
            .and_then(normalize)?;

        Ok(SuperPaths {
            super_abspath: super_abspath.to_path_buf(),
            config_abspath: super_abspath.join(SUPERPROJECT_CONFIG_FILENAME),
            super_to_cwd_relpath,
        })
    }

    pub fn is_cwd_toplevel(&self) -> bool {
        self.super_to_cwd_relpath.as_os_str().is_empty()
    }
}

/// Paths of a single subproject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubPaths {
    pub super_to_sub_relpath: PathBuf,
    /// Empty if the current work directory is the subproject itself.
    pub cwd_to_sub_relpath: PathBuf,
    pub sub_name: String,
    pub subproject_abspath: PathBuf,
    pub metadata_abspath: PathBuf,
    pub patches_abspath: PathBuf,
}

impl SubPaths {
    /// Paths for a subproject given relative to the toplevel directory.
    pub fn from_super_relpath(super_paths: &SuperPaths, super_to_sub_relpath: &Path) -> Result<Self> {
        let super_to_sub_relpath = normalize(super_to_sub_relpath)?;
        let cwd_to_sub_relpath = relative_to(&super_to_sub_relpath, &super_paths.super_to_cwd_relpath);
        Ok(Self::build(super_paths, super_to_sub_relpath, cwd_to_sub_relpath))
    }

    /// Paths for a subproject given relative to the current work directory.
    pub fn from_cwd_relpath(super_paths: &SuperPaths, cwd_to_sub_relpath: &Path) -> Result<Self> {
        let joined = super_paths.super_to_cwd_relpath.join(cwd_to_sub_relpath);
        let super_to_sub_relpath = normalize(&joined).map_err(|_| {
            Error::invalid_argument(format!(
                "Path '{}' points outside of the superproject!",
                cwd_to_sub_relpath.display()
            ))
        })?;
        let cwd_to_sub_relpath = relative_to(&super_to_sub_relpath, &super_paths.super_to_cwd_relpath);
        Ok(Self::build(super_paths, super_to_sub_relpath, cwd_to_sub_relpath))
    }

    fn build(super_paths: &SuperPaths, super_to_sub_relpath: PathBuf, cwd_to_sub_relpath: PathBuf) -> Self {
        let subproject_abspath = super_paths.super_abspath.join(&super_to_sub_relpath);
        SubPaths {
            sub_name: super_to_sub_relpath
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            metadata_abspath: subproject_abspath.join(METADATA_FILENAME),
            patches_abspath: subproject_abspath.join(PATCHES_DIRNAME),
            subproject_abspath,
            super_to_sub_relpath,
            cwd_to_sub_relpath,
        }
    }

    /// The subproject path as written into the superproject config.
    pub fn config_value(&self) -> String {
        self.super_to_sub_relpath.to_string_lossy().into_owned()
    }

    /// Path of a file in the patches directory, relative to the toplevel.
    pub fn super_to_patch_relpath(&self, filename: &str) -> PathBuf {
        self.super_to_sub_relpath.join(PATCHES_DIRNAME).join(filename)
    }

    pub fn super_to_metadata_relpath(&self) -> PathBuf {
        self.super_to_sub_relpath.join(METADATA_FILENAME)
    }
}

/// Lexically normalize a relative path.
///
/// Fails for absolute paths and for paths whose `..` components climb above
/// the starting directory.
pub fn normalize(path: &Path) -> Result<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(Error::invalid_argument(format!(
                        "Path '{}' points outside of the superproject!",
                        path.display()
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::invalid_argument(format!(
                    "Path '{}' must be relative!",
                    path.display()
                )));
            }
        }
    }
    Ok(parts.iter().collect())
}

/// The path that leads from `base` to `target`. Both must be normalized.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..base.len() {
        result.push("..");
    }
    for component in &target[common..] {
        result.push(component);
    }
    result
}

/// Find the subproject that contains `super_to_cwd_relpath`.
///
/// The match is done on whole path components, so `sub` does not contain
/// `subproject`.
pub fn subproject_containing<'a>(subprojects: &'a [String], super_to_cwd_relpath: &Path) -> Option<&'a str> {
    subprojects
        .iter()
        .find(|sub| super_to_cwd_relpath.starts_with(Path::new(sub.as_str())))
        .map(String::as_str)
}
