//! # Subproject Metadata
//!
//! Reading and writing of the `.subproject` file and the two derived views
//! the patch stack works with:
//!
//! - [`SubtreeDim`]: how many patches are applied and the checksum of the
//!   materialized subtree.
//! - [`PatchesDim`]: the sorted list of patch files in `patches/`.
//!
//! An absent `appliedIndex` means that every tracked patch is applied. The
//! key is only written when the pointer differs from that state, so a
//! subproject without local changes to its stack has no `appliedIndex` at
//! all.
//!
//! Every write goes through the config text engine, so sections and keys
//! always end up in ascending order.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::info;

use crate::config::{self, BoxedLines, ConfigLines, LineKind};
use crate::defaults::{metadata as keys, PATCH_EXTENSION};
use crate::error::{Error, Result};

/// The values of a `.subproject` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub url: Option<String>,
    pub revision: Option<String>,
    pub object_id: Option<String>,
    pub applied_index: Option<String>,
    pub checksum: Option<String>,
}

impl Metadata {
    /// Extract the known keys from their sections. Unknown keys are ignored.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let mut metadata = Metadata::default();
        let mut section: Vec<u8> = Vec::new();

        for line in config::parse(content) {
            let line = line?;
            match line.kind {
                LineKind::Header {
                    section: name,
                    subsection: None,
                } => section = name,
                LineKind::Header { .. } => section.clear(),
                LineKind::KeyValue { key, value } => {
                    let value = String::from_utf8_lossy(&value).into_owned();
                    let slot = match (section.as_slice(), key.as_slice()) {
                        (s, k) if s == keys::UPSTREAM.as_bytes() && k == keys::URL.as_bytes() => {
                            &mut metadata.url
                        }
                        (s, k) if s == keys::UPSTREAM.as_bytes() && k == keys::REVISION.as_bytes() => {
                            &mut metadata.revision
                        }
                        (s, k) if s == keys::UPSTREAM.as_bytes() && k == keys::OBJECT_ID.as_bytes() => {
                            &mut metadata.object_id
                        }
                        (s, k) if s == keys::SUBTREE.as_bytes() && k == keys::APPLIED_INDEX.as_bytes() => {
                            &mut metadata.applied_index
                        }
                        (s, k) if s == keys::SUBTREE.as_bytes() && k == keys::CHECKSUM.as_bytes() => {
                            &mut metadata.checksum
                        }
                        _ => continue,
                    };
                    *slot = Some(value);
                }
                LineKind::Empty | LineKind::Comment => {}
            }
        }

        Ok(metadata)
    }

    /// Read the metadata file at `path`.
    ///
    /// A missing file is an invalid state: every subproject has one.
    pub fn read(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::invalid_state(format!(
                "The metadata file '{}' does not exist!",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

/// The subtree dimension of a subproject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreeDim {
    /// `None` if every tracked patch is applied.
    pub applied_index: Option<i64>,
    pub checksum: Option<String>,
}

impl SubtreeDim {
    pub fn from_metadata(metadata: &Metadata) -> Result<Self> {
        let applied_index = metadata
            .applied_index
            .as_deref()
            .map(|value| {
                value.parse::<i64>().map_err(|_| {
                    Error::invalid_state(format!("The appliedIndex '{}' is not an integer!", value))
                })
            })
            .transpose()?;

        Ok(SubtreeDim {
            applied_index,
            checksum: metadata.checksum.clone(),
        })
    }

    /// The applied pointer, resolving the absent default.
    ///
    /// Ranges from `-1` (nothing applied) to `patches.len() - 1`.
    pub fn effective_index(&self, patches: &PatchesDim) -> i64 {
        self.applied_index.unwrap_or(patches.len() as i64 - 1)
    }
}

/// The patches dimension of a subproject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchesDim {
    /// File names, sorted. Index 0 is applied first.
    pub patches: Vec<String>,
}

impl PatchesDim {
    /// List the `*.patch` files in `patches_dir`. A missing directory means
    /// there are no patches.
    pub fn read(patches_dir: &Path) -> Result<Self> {
        let entries = match fs::read_dir(patches_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PatchesDim::default()),
            Err(e) => return Err(e.into()),
        };

        let mut patches = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(PATCH_EXTENSION) {
                patches.push(name);
            }
        }
        patches.sort();
        Ok(PatchesDim { patches })
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Fail if the applied pointer is outside of `[-1, len(patches))`.
pub fn ensure_dims_are_consistent(subtree: &SubtreeDim, patches: &PatchesDim) -> Result<()> {
    let index = subtree.effective_index(patches);
    if !(-1..patches.len() as i64).contains(&index) {
        return Err(Error::invalid_state("Metadata is inconsistent!"));
    }
    Ok(())
}

fn read_or_empty(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Values written when a subtree is integrated from upstream.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    pub url: &'a str,
    /// `None` tracks the default branch.
    pub revision: Option<&'a str>,
    pub object_id: &'a str,
    pub checksum: Option<&'a str>,
}

/// Record the upstream origin of the subtree.
pub fn write_upstream(path: &Path, upstream: &Upstream<'_>) -> Result<()> {
    let content = read_or_empty(path)?;

    let lines: BoxedLines = Box::new(
        config::parse(&content)
            .add_section(keys::UPSTREAM)
            .set_key_value(keys::UPSTREAM, keys::URL, upstream.url),
    );
    let lines: BoxedLines = match upstream.revision {
        Some(revision) => Box::new(lines.set_key_value(keys::UPSTREAM, keys::REVISION, revision)),
        None => Box::new(lines.drop_key(keys::UPSTREAM, keys::REVISION)),
    };
    let lines: BoxedLines = match upstream.checksum {
        Some(checksum) => Box::new(
            lines
                .add_section(keys::SUBTREE)
                .set_key_value(keys::SUBTREE, keys::CHECKSUM, checksum),
        ),
        None => lines,
    };
    let text = lines
        .set_key_value(keys::UPSTREAM, keys::OBJECT_ID, upstream.object_id)
        .unparse()?;

    fs::write(path, text)?;
    Ok(())
}

/// Store the applied pointer. `None` restores the "all applied" default.
pub fn write_applied_index(path: &Path, applied_index: Option<i64>) -> Result<()> {
    let content = read_or_empty(path)?;

    let text = match applied_index {
        Some(index) => {
            info!("Setting appliedIndex of {} to {}", path.display(), index);
            config::parse(&content)
                .add_section(keys::SUBTREE)
                .set_key_value(keys::SUBTREE, keys::APPLIED_INDEX, index.to_string())
                .unparse()?
        }
        None => {
            info!("Dropping appliedIndex of {}", path.display());
            config::parse(&content)
                .drop_key(keys::SUBTREE, keys::APPLIED_INDEX)
                .drop_section_if_empty(keys::SUBTREE)
                .unparse()?
        }
    };

    fs::write(path, text)?;
    Ok(())
}

pub fn write_checksum(path: &Path, checksum: &str) -> Result<()> {
    let content = read_or_empty(path)?;
    let text = config::parse(&content)
        .add_section(keys::SUBTREE)
        .set_key_value(keys::SUBTREE, keys::CHECKSUM, checksum)
        .unparse()?;
    fs::write(path, text)?;
    Ok(())
}
