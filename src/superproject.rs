//! # Superproject Discovery and Configuration
//!
//! Starting from the current working directory, the directory tree is walked
//! upwards looking for two markers: the `.subpatch` configuration file and
//! the `.git` directory of a git repository. The first directory containing
//! each marker is recorded.
//!
//! The combination of both results decides what kind of superproject the
//! command operates on:
//!
//! | `.subpatch` | `.git` | Result                                        |
//! |-------------|--------|-----------------------------------------------|
//! | no          | no     | no superproject                               |
//! | no          | yes    | git superproject, not configured              |
//! | yes         | no     | plain superproject, configured                |
//! | yes         | yes    | git superproject, configured (same directory) |
//!
//! Having an empty `.subpatch` file is different from having none: an empty
//! file means the superproject is configured but has no subprojects yet.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::{self, ConfigLines, LineKind};
use crate::defaults::{superproject as keys, SUPERPROJECT_CONFIG_FILENAME};
use crate::error::{Error, Result};
use crate::scm::{Backend, SuperHelper};

/// Raw result of the upward directory walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindSuperprojectData {
    /// Directory containing the `.subpatch` file.
    pub super_path: Option<PathBuf>,
    /// Toplevel directory of the git repository.
    pub scm_path: Option<PathBuf>,
}

/// Walk from `start_dir` upwards and record the markers found.
///
/// The walk stops as soon as both markers are found or at the root.
pub fn find_superproject(start_dir: &Path) -> FindSuperprojectData {
    let mut data = FindSuperprojectData::default();

    for dir in start_dir.ancestors() {
        if data.super_path.is_none() && dir.join(SUPERPROJECT_CONFIG_FILENAME).exists() {
            data.super_path = Some(dir.to_path_buf());
        }
        if data.scm_path.is_none() && dir.join(".git").exists() {
            data.scm_path = Some(dir.to_path_buf());
        }
        if data.super_path.is_some() && data.scm_path.is_some() {
            break;
        }
    }

    debug!("Superproject search from {}: {:?}", start_dir.display(), data);
    data
}

/// A discovered superproject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superproject {
    /// The toplevel directory.
    pub path: PathBuf,
    pub configured: bool,
    pub backend: Backend,
}

/// Decide which superproject the markers describe.
///
/// Returns `None` if neither marker was found.
pub fn check_superproject_data(data: &FindSuperprojectData) -> Result<Option<Superproject>> {
    match (&data.super_path, &data.scm_path) {
        (None, None) => Ok(None),
        (None, Some(scm_path)) => Ok(Some(Superproject {
            path: scm_path.clone(),
            configured: false,
            backend: Backend::Git,
        })),
        (Some(super_path), None) => Ok(Some(Superproject {
            path: super_path.clone(),
            configured: true,
            backend: Backend::Plain,
        })),
        (Some(super_path), Some(scm_path)) => {
            if super_path != scm_path {
                return Err(Error::not_implemented_yet(
                    "subpatch config file is not at the toplevel directory of the SCM repository!",
                ));
            }
            Ok(Some(Superproject {
                path: super_path.clone(),
                configured: true,
                backend: Backend::Git,
            }))
        }
    }
}

impl Superproject {
    /// Discover the superproject containing `cwd`.
    pub fn discover(cwd: &Path) -> Result<Self> {
        check_superproject_data(&find_superproject(cwd))?.ok_or(Error::SuperprojectNotFound)
    }

    pub fn ensure_configured(&self) -> Result<()> {
        if !self.configured {
            return Err(Error::SuperprojectNotConfigured);
        }
        Ok(())
    }

    pub fn ensure_git(&self) -> Result<()> {
        if self.backend != Backend::Git {
            return Err(Error::not_implemented_yet(
                "This feature currently works only in a git superproject!",
            ));
        }
        Ok(())
    }

    pub fn helper(&self) -> Box<dyn SuperHelper> {
        self.backend.helper(&self.path)
    }
}

/// Contents of the `.subpatch` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperprojectConfig {
    /// Subproject paths relative to the toplevel directory, in file order.
    pub subprojects: Vec<String>,
}

impl SuperprojectConfig {
    /// Extract the `path` keys of the `[subprojects]` section.
    ///
    /// Keys in any other section are ignored.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let mut subprojects = Vec::new();
        let mut in_subprojects = false;

        for line in config::parse(content) {
            let line = line?;
            match &line.kind {
                LineKind::Header { .. } => {
                    in_subprojects = line.is_section(keys::SECTION.as_bytes());
                }
                LineKind::KeyValue { key, value } if in_subprojects && key == keys::PATH.as_bytes() => {
                    subprojects.push(String::from_utf8_lossy(value).into_owned());
                }
                _ => {}
            }
        }

        Ok(SuperprojectConfig { subprojects })
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::parse(&fs::read(path)?)
    }

    pub fn contains(&self, super_to_sub_relpath: &str) -> bool {
        self.subprojects.iter().any(|sub| sub == super_to_sub_relpath)
    }
}

/// Record a new subproject path in the config file at `config_path`.
///
/// The file is created if it does not exist. Paths are kept sorted.
pub fn add_subproject_to_config(config_path: &Path, super_to_sub_relpath: &str) -> Result<()> {
    let content = match fs::read(config_path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let text = config::parse(&content)
        .add_section(keys::SECTION)
        .append_key_value(keys::SECTION, keys::PATH, super_to_sub_relpath)
        .unparse()?;
    fs::write(config_path, text)?;
    Ok(())
}
