//! # Patch Stack
//!
//! The patch stack of a subproject has two coupled dimensions: the sorted
//! patch files in `patches/` and the applied pointer `p` in the metadata.
//! `p` ranges from `-1` (no patch applied) to `N - 1` (all `N` patches
//! applied). Every operation loads both, checks that they are consistent and
//! only then changes anything.
//!
//! The content of the subtree is only ever changed by the SCM adapter. All
//! changes are staged, never committed. If the adapter fails halfway, the
//! metadata is not updated and the staging area shows what happened.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::split_lines;
use crate::error::{Error, Result};
use crate::git::ApplyDirection;
use crate::metadata::{self, ensure_dims_are_consistent, Metadata, PatchesDim, SubtreeDim};
use crate::paths::SubPaths;
use crate::scm::SuperHelper;

/// The loaded patch stack of one subproject.
pub struct PatchStack<'a> {
    helper: &'a dyn SuperHelper,
    sub_paths: &'a SubPaths,
    subtree: SubtreeDim,
    patches: PatchesDim,
}

impl<'a> PatchStack<'a> {
    /// Load metadata and patch list and ensure they are consistent.
    pub fn load(helper: &'a dyn SuperHelper, sub_paths: &'a SubPaths) -> Result<Self> {
        let metadata = Metadata::read(&sub_paths.metadata_abspath)?;
        let subtree = SubtreeDim::from_metadata(&metadata)?;
        let patches = PatchesDim::read(&sub_paths.patches_abspath)?;
        ensure_dims_are_consistent(&subtree, &patches)?;

        Ok(PatchStack {
            helper,
            sub_paths,
            subtree,
            patches,
        })
    }

    /// The applied pointer `p`.
    pub fn applied_index(&self) -> i64 {
        self.subtree.effective_index(&self.patches)
    }

    pub fn patches(&self) -> &[String] {
        &self.patches.patches
    }

    fn top_index(&self) -> i64 {
        self.patches.len() as i64 - 1
    }

    fn patch_abspath(&self, filename: &str) -> PathBuf {
        self.sub_paths.patches_abspath.join(filename)
    }

    /// Apply the patch file at `patch_path` and add it to the stack.
    ///
    /// All tracked patches must be applied, and the new file name must sort
    /// after every tracked one. Returns the file name of the new patch.
    pub fn apply(&mut self, patch_path: &Path) -> Result<String> {
        if self.applied_index() != self.top_index() {
            return Err(Error::invalid_argument(
                "Cannot apply new patch. Not all existing patches are applied!",
            ));
        }

        let filename = patch_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Path '{}' must point to a file!",
                    patch_path.display()
                ))
            })?;

        if self.patches.patches.contains(&filename) {
            return Err(Error::invalid_argument(format!(
                "The filename '{}' must be unique. There is already a patch with the same name!",
                filename
            )));
        }
        if self.patches.patches.last().is_some_and(|last| *last > filename) {
            return Err(Error::invalid_argument(format!(
                "The patch filenames must be in order. The new patch filename '{}' does not sort latest!",
                filename
            )));
        }

        let sub = &self.sub_paths.super_to_sub_relpath;
        let patch = [patch_path.to_path_buf()];
        if !self.helper.apply_patches(sub, &patch, ApplyDirection::Forward, true)? {
            return Err(Error::invalid_argument(format!(
                "The patch '{}' does not apply to the working tree.",
                filename
            )));
        }
        self.helper.apply_patches(sub, &patch, ApplyDirection::Forward, false)?;

        fs::create_dir_all(&self.sub_paths.patches_abspath)?;
        fs::copy(patch_path, self.patch_abspath(&filename))?;
        self.helper.add(&[self.sub_paths.super_to_patch_relpath(&filename)])?;

        // The new patch is applied, so the stack is fully applied again
        self.patches.patches.push(filename.clone());
        self.subtree.applied_index = None;
        self.write_applied_index()?;

        info!("Applied patch {} to {}", filename, sub.display());
        Ok(filename)
    }

    /// Apply the next patch, or all remaining ones with `all`.
    ///
    /// Returns the names of the applied patches in application order.
    pub fn push(&mut self, all: bool) -> Result<Vec<String>> {
        let current = self.applied_index();
        let top = self.top_index();
        if current == top {
            if all {
                return Ok(Vec::new());
            }
            return Err(Error::invalid_argument("There is no patch to push!"));
        }
        self.move_to(if all { top } else { current + 1 })
    }

    /// Revert the current patch, or all applied ones with `all`.
    ///
    /// Returns the names of the reverted patches in reverting order.
    pub fn pop(&mut self, all: bool) -> Result<Vec<String>> {
        let current = self.applied_index();
        if current == -1 {
            if all {
                return Ok(Vec::new());
            }
            return Err(Error::invalid_argument("There is no patch to pop!"));
        }
        self.move_to(if all { -1 } else { current - 1 })
    }

    /// Move the applied pointer to `target` with a single call to the SCM
    /// adapter.
    fn move_to(&mut self, target: i64) -> Result<Vec<String>> {
        let current = self.applied_index();
        if !(-1..=self.top_index()).contains(&target) {
            return Err(Error::invalid_state(format!(
                "Patch index {} is out of range!",
                target
            )));
        }

        let (direction, names): (ApplyDirection, Vec<String>) = if target > current {
            let range = (current + 1) as usize..=target as usize;
            (ApplyDirection::Forward, self.patches.patches[range].to_vec())
        } else {
            let range = (target + 1) as usize..=current as usize;
            let mut names = self.patches.patches[range].to_vec();
            names.reverse();
            (ApplyDirection::Reverse, names)
        };
        if names.is_empty() {
            return Ok(names);
        }

        let files: Vec<PathBuf> = names.iter().map(|name| self.patch_abspath(name)).collect();
        self.helper.apply_patches(
            &self.sub_paths.super_to_sub_relpath,
            &files,
            direction,
            false,
        )?;

        self.subtree.applied_index = (target != self.top_index()).then_some(target);
        self.write_applied_index()?;

        info!(
            "Moved applied index of {} from {} to {}",
            self.sub_paths.super_to_sub_relpath.display(),
            current,
            target
        );
        Ok(names)
    }

    fn write_applied_index(&self) -> Result<()> {
        metadata::write_applied_index(&self.sub_paths.metadata_abspath, self.subtree.applied_index)?;
        self.helper.add(&[self.sub_paths.super_to_metadata_relpath()])
    }

    /// Replace the diff of the current patch with the staged changes of the
    /// subtree. Returns the file name of the current patch.
    pub fn sync(&self) -> Result<String> {
        let current = self.applied_index();
        if current < 0 {
            return Err(Error::invalid_argument("There is no current patch."));
        }

        let filename = self.patches.patches[current as usize].clone();
        let patch_abspath = self.patch_abspath(&filename);

        let sub = &self.sub_paths.super_to_sub_relpath;
        let diff = self.helper.get_diff_for_subtree(sub, false)?;
        let stat = self.helper.get_diff_for_subtree(sub, true)?;

        let old = fs::read(&patch_abspath)?;
        let new = splice_patch(&old, &stat, &diff);

        let mut tmp_abspath = patch_abspath.clone().into_os_string();
        tmp_abspath.push(".tmp");
        fs::write(&tmp_abspath, new)?;
        fs::rename(&tmp_abspath, &patch_abspath)?;

        self.helper.add(&[self.sub_paths.super_to_patch_relpath(&filename)])?;
        Ok(filename)
    }
}

/// Replace the diff body of a patch file.
///
/// Everything up to and including the first `---` line is kept. Then `stat`,
/// an empty line and `diff` follow. The old body is dropped up to the `-- `
/// signature line, which is kept together with everything after it.
pub fn splice_patch(old: &[u8], stat: &[u8], diff: &[u8]) -> Vec<u8> {
    let mut lines = split_lines(old);
    let mut new = Vec::with_capacity(old.len() + stat.len() + diff.len());

    let mut found_separator = false;
    for line in lines.by_ref() {
        new.extend_from_slice(line);
        if line == b"---\n" {
            found_separator = true;
            break;
        }
    }
    if !found_separator {
        warn!("Patch has no '---' separator line. Leaving it unchanged");
        return old.to_vec();
    }

    new.extend_from_slice(stat);
    new.push(b'\n');
    new.extend_from_slice(diff);

    for line in lines.skip_while(|line| *line != b"-- \n") {
        new.extend_from_slice(line);
    }
    new
}
