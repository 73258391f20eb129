//! # subpatch Library
//!
//! This library vendors third-party git repositories into a superproject as
//! plain subtrees and maintains a stack of local patches on top of each of
//! them. It is used by the `subpatch` command-line tool, but the building
//! blocks can be driven directly as well.
//!
//! ## Quick Example
//!
//! ```
//! use subpatch::config::{self, ConfigLines};
//!
//! let content = b"[upstream]\n\turl = ../sub\n";
//! let text = config::parse(content)
//!     .add_section("subtree")
//!     .set_key_value("subtree", "appliedIndex", "0")
//!     .unparse()
//!     .unwrap();
//! assert_eq!(
//!     text,
//!     b"[subtree]\n\tappliedIndex = 0\n[upstream]\n\turl = ../sub\n".to_vec()
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Superproject (`superproject`, `scm`)**: the repository that vendors
//!   subprojects. It is found by walking upwards from the working directory
//!   and is configured by the `.subpatch` file at its toplevel. All version
//!   control access goes through the `SuperHelper` trait.
//! - **Subproject metadata (`metadata`)**: the `.subproject` file of every
//!   subproject records where the subtree came from and how many patches are
//!   applied.
//! - **Config text engine (`config`)**: a lossless, line-oriented reader and
//!   editor for both files. Untouched lines survive byte for byte and edits
//!   keep sections and keys sorted.
//! - **Patch stack (`stack`)**: `apply`, `push`, `pop` and `sync` move the
//!   applied pointer through the sorted files in `patches/`.
//! - **Acquisition (`repository`, `git`, `url`)**: turns a URL and an
//!   optional revision into a plain tree and the object id it came from.
//!
//! Every mutating operation stages its changes in the superproject but never
//! commits. The staging area is the record of what a command did.

pub mod config;
pub mod defaults;
pub mod error;
pub mod exit_codes;
pub mod git;
pub mod metadata;
pub mod paths;
pub mod repository;
pub mod scm;
pub mod settings;
pub mod stack;
pub mod superproject;
pub mod url;

#[cfg(test)]
mod config_proptest;
