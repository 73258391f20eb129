//! # Status Command Implementation
//!
//! Prints a human-readable summary of every subproject: where it was
//! integrated from, pending changes in the working tree and the staging
//! area, and the state of its patch stack. The output is markdown and not
//! meant for scripts.

use anyhow::Result;
use std::fmt;
use std::path::Path;

use subpatch::exit_codes;
use subpatch::git;
use subpatch::metadata::{ensure_dims_are_consistent, Metadata, PatchesDim, SubtreeDim};
use subpatch::paths::SubPaths;
use subpatch::settings::Settings;
use subpatch::superproject::SuperprojectConfig;

use super::configured_git_superproject;

/// Summary of a single subproject.
#[derive(Debug, Default)]
struct SubprojectStatus {
    /// Path relative to the toplevel directory.
    path: String,
    url: Option<String>,
    revision: Option<String>,
    object_id: Option<String>,
    untracked: usize,
    unstaged: usize,
    uncommitted: usize,
    patches: usize,
    applied: usize,
}

/// Number of `paths` inside the subproject at `subproject`.
fn count_inside(subproject: &str, paths: &[String]) -> usize {
    paths
        .iter()
        .filter(|path| Path::new(path.as_str()).starts_with(subproject))
        .count()
}

impl fmt::Display for SubprojectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.path;
        writeln!(f, "# subproject at '{}'", p)?;
        writeln!(f)?;
        if let Some(url) = &self.url {
            writeln!(f, "* was integrated from URL: {}", url)?;
        }
        if let Some(revision) = &self.revision {
            writeln!(f, "* has integrated revision: {}", revision)?;
        }
        if let Some(object_id) = &self.object_id {
            writeln!(f, "* has integrated object id: {}", object_id)?;
        }

        if self.untracked > 0 {
            writeln!(f, "* There are n={} untracked files and/or directories:", self.untracked)?;
            writeln!(f, "    - To see them execute:")?;
            writeln!(f, "        `git status {}`", p)?;
            writeln!(f, "        `git ls-files --exclude-standard -o {}`", p)?;
            writeln!(f, "    - Use `git add {}` to add all of them", p)?;
            writeln!(f, "    - Use `git add {}/<filename>` to just add some of them", p)?;
            writeln!(f, "    - Use `rm <filename>` to remove them")?;
        }
        if self.unstaged > 0 {
            writeln!(f, "* There are n={} modified files not staged for commit:", self.unstaged)?;
            writeln!(f, "    - To see them execute:")?;
            writeln!(f, "        `git status {}` or", p)?;
            writeln!(f, "        `git diff {}`", p)?;
            writeln!(f, "    - Use `git add {}` to update what will be committed", p)?;
            writeln!(f, "    - Use `git restore {}` to discard changes in working directory", p)?;
        }
        if self.uncommitted > 0 {
            writeln!(
                f,
                "* There are n={} modified files that are staged, but not committed:",
                self.uncommitted
            )?;
            writeln!(f, "    - To see them execute:")?;
            writeln!(f, "        `git status {}` or", p)?;
            writeln!(f, "        `git diff --staged {}`", p)?;
            writeln!(f, "    - Use `git commit {}` to commit the changes", p)?;
            writeln!(f, "    - Use `git restore --staged {}` to unstage", p)?;
        }

        if self.patches > 0 {
            writeln!(f, "* There are n={} patches.", self.patches)?;
            if self.applied != self.patches {
                writeln!(f, "* There are only n={} patches applied.", self.applied)?;
            }
        }
        Ok(())
    }
}

/// Execute the `status` command.
pub fn execute(_settings: &Settings) -> Result<u8> {
    let (_superx, super_paths) = configured_git_superproject()?;
    let config = SuperprojectConfig::read(&super_paths.config_abspath)?;
    if config.subprojects.is_empty() {
        return Ok(exit_codes::SUCCESS);
    }

    let toplevel = &super_paths.super_abspath;
    let unstaged = git::diff_name_only(toplevel, false, None)?;
    let uncommitted = git::diff_name_only(toplevel, true, None)?;
    let untracked = git::ls_files_untracked(toplevel)?;

    let mut statuses = Vec::with_capacity(config.subprojects.len());
    for subproject in &config.subprojects {
        let sub_paths = SubPaths::from_super_relpath(&super_paths, Path::new(subproject))?;
        let metadata = Metadata::read(&sub_paths.metadata_abspath)?;
        let subtree = SubtreeDim::from_metadata(&metadata)?;
        let patches = PatchesDim::read(&sub_paths.patches_abspath)?;
        ensure_dims_are_consistent(&subtree, &patches)?;

        statuses.push(SubprojectStatus {
            path: subproject.clone(),
            untracked: count_inside(subproject, &untracked),
            unstaged: count_inside(subproject, &unstaged),
            uncommitted: count_inside(subproject, &uncommitted),
            patches: patches.len(),
            applied: (subtree.effective_index(&patches) + 1) as usize,
            url: metadata.url,
            revision: metadata.revision,
            object_id: metadata.object_id,
        });
    }

    println!("NOTE: The format of the output is human-readable and unstable. Do not use in scripts!");
    println!("NOTE: The format is markdown currently. Will mostly change in the future.");
    if !super_paths.is_cwd_toplevel() {
        println!("WARNING: The current working directory is not the toplevel directory of the superproject.");
        println!("WARNING: The paths in this console output are wrong (for now)!");
    }
    println!();

    let output: Vec<String> = statuses.iter().map(ToString::to_string).collect();
    print!("{}", output.join("\n"));
    Ok(exit_codes::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_inside_matches_whole_components() {
        let paths = vec![
            "sub/a".to_string(),
            "sub/b/c".to_string(),
            "subproject/a".to_string(),
            "other".to_string(),
        ];
        assert_eq!(count_inside("sub", &paths), 2);
        assert_eq!(count_inside("subproject", &paths), 1);
        assert_eq!(count_inside("missing", &paths), 0);
    }

    #[test]
    fn test_display_clean_subproject() {
        let status = SubprojectStatus {
            path: "external/lib".to_string(),
            url: Some("../lib".to_string()),
            object_id: Some("c4bcf3c2597415b0b9d1a4f1ac7e3d8e8d5b9c1f".to_string()),
            ..Default::default()
        };
        assert_eq!(
            status.to_string(),
            "# subproject at 'external/lib'\n\
             \n\
             * was integrated from URL: ../lib\n\
             * has integrated object id: c4bcf3c2597415b0b9d1a4f1ac7e3d8e8d5b9c1f\n"
        );
    }

    #[test]
    fn test_display_patches_and_changes() {
        let status = SubprojectStatus {
            path: "sub".to_string(),
            uncommitted: 2,
            patches: 3,
            applied: 1,
            ..Default::default()
        };
        let text = status.to_string();
        assert!(text.contains("* There are n=2 modified files that are staged, but not committed:\n"));
        assert!(text.contains("    - Use `git restore --staged sub` to unstage\n"));
        assert!(text.contains("* There are n=3 patches.\n* There are only n=1 patches applied.\n"));
        assert!(!text.contains("untracked"));
    }

    #[test]
    fn test_display_all_patches_applied() {
        let status = SubprojectStatus {
            path: "sub".to_string(),
            patches: 2,
            applied: 2,
            ..Default::default()
        };
        assert!(!status.to_string().contains("only"));
    }
}
