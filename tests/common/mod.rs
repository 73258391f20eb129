//! Shared test utilities for E2E tests.
//!
//! The fixtures drive a real `git` binary inside temporary directories.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new();
//!     fixture.subpatch().args(["add", "../subproject"]).assert().success();
//! }
//! ```
//!
//! Layout of a fixture:
//!
//! ```text
//! <tmp>/subproject/    upstream repository, tags v1 and v2
//! <tmp>/superproject/  git repository with one commit, not configured
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, patches, TestFixture};
}

/// Environment that makes git and subpatch independent of the host setup.
const ENV: &[(&str, &str)] = &[
    ("GIT_AUTHOR_NAME", "Test"),
    ("GIT_AUTHOR_EMAIL", "test@example.com"),
    ("GIT_COMMITTER_NAME", "Test"),
    ("GIT_COMMITTER_EMAIL", "test@example.com"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ("SUBPATCH_NO_SHALLOW_FETCH", "1"),
];

/// Run git in `dir` and return its stdout. Panics if git fails.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .envs(ENV.iter().copied())
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("git output is not UTF-8")
}

/// Patch files for the `hello` file of the upstream repository at `v1`.
#[allow(dead_code)]
pub mod patches {
    /// Changes `hello` from `first` to `changed`.
    pub const CHANGE_HELLO: &str = concat!(
        "From 0000000000000000000000000000000000000000 Mon Sep 17 00:00:00 2001\n",
        "From: Test <test@example.com>\n",
        "Subject: [PATCH] Change hello\n",
        "\n",
        "---\n",
        " hello | 2 +-\n",
        " 1 file changed, 1 insertion(+), 1 deletion(-)\n",
        "\n",
        "diff --git a/hello b/hello\n",
        "--- a/hello\n",
        "+++ b/hello\n",
        "@@ -1 +1 @@\n",
        "-first\n",
        "+changed\n",
        "-- \n",
        "2.39.2\n",
        "\n",
    );

    /// Adds the file `extra`. Applies on top of [`CHANGE_HELLO`].
    pub const ADD_EXTRA: &str = concat!(
        "From 0000000000000000000000000000000000000000 Mon Sep 17 00:00:00 2001\n",
        "From: Test <test@example.com>\n",
        "Subject: [PATCH] Add extra\n",
        "\n",
        "---\n",
        " extra | 1 +\n",
        " 1 file changed, 1 insertion(+)\n",
        " create mode 100644 extra\n",
        "\n",
        "diff --git a/extra b/extra\n",
        "new file mode 100644\n",
        "--- /dev/null\n",
        "+++ b/extra\n",
        "@@ -0,0 +1 @@\n",
        "+extra\n",
        "-- \n",
        "2.39.2\n",
        "\n",
    );
}

/// An upstream repository next to a superproject.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create both repositories.
    ///
    /// Upstream history: `v1` has `hello` = `first` and `old`, `v2` has
    /// `hello` = `second` and `new`.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");

        let upstream = temp_dir.child("subproject");
        upstream.create_dir_all().expect("Failed to create upstream");
        git(upstream.path(), &["init", "-q"]);
        upstream.child("hello").write_str("first\n").unwrap();
        upstream.child("old").write_str("old\n").unwrap();
        git(upstream.path(), &["add", "hello", "old"]);
        git(upstream.path(), &["commit", "-q", "-m", "first"]);
        git(upstream.path(), &["tag", "v1"]);
        upstream.child("hello").write_str("second\n").unwrap();
        upstream.child("new").write_str("new\n").unwrap();
        git(upstream.path(), &["rm", "-q", "old"]);
        git(upstream.path(), &["add", "hello", "new"]);
        git(upstream.path(), &["commit", "-q", "-m", "second"]);
        git(upstream.path(), &["tag", "v2"]);

        let superproject = temp_dir.child("superproject");
        superproject.create_dir_all().expect("Failed to create superproject");
        git(superproject.path(), &["init", "-q"]);
        superproject.child("README").write_str("superproject\n").unwrap();
        git(superproject.path(), &["add", "README"]);
        git(superproject.path(), &["commit", "-q", "-m", "initial"]);

        Self { temp_dir }
    }

    /// Toplevel directory of the superproject.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("superproject")
    }

    /// The upstream repository.
    #[allow(dead_code)]
    pub fn upstream(&self) -> PathBuf {
        self.temp_dir.path().join("subproject")
    }

    /// Create a child path in the superproject.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child("superproject").child(path)
    }

    /// Write a file next to both repositories and return its path.
    #[allow(dead_code)]
    pub fn outside_file(&self, name: &str, content: &str) -> PathBuf {
        let child = self.temp_dir.child(name);
        child.write_str(content).expect("Failed to write file");
        child.path().to_path_buf()
    }

    /// Create a command configured to run in the superproject.
    pub fn subpatch(&self) -> assert_cmd::Command {
        self.subpatch_in("")
    }

    /// Create a command configured to run in `relpath` of the superproject.
    pub fn subpatch_in(&self, relpath: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("subpatch");
        cmd.current_dir(self.path().join(relpath));
        cmd.envs(ENV.iter().copied());
        cmd
    }

    /// Run git in the superproject.
    #[allow(dead_code)]
    pub fn git(&self, args: &[&str]) -> String {
        git(&self.path(), args)
    }

    /// Read a file of the superproject.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Add the upstream repository at `v1` as `subproject` and commit.
    #[allow(dead_code)]
    pub fn with_subproject(self) -> Self {
        self.subpatch()
            .args(["add", "-q", "../subproject", "-r", "v1"])
            .assert()
            .success();
        self.git(&["commit", "-q", "-m", "add subproject"]);
        self
    }

    /// Like [`TestFixture::with_subproject`], plus both patches applied and
    /// committed.
    #[allow(dead_code)]
    pub fn with_patches(self) -> Self {
        let fixture = self.with_subproject();
        let change = fixture.outside_file("0001-change-hello.patch", patches::CHANGE_HELLO);
        let extra = fixture.outside_file("0002-add-extra.patch", patches::ADD_EXTRA);
        for patch in [change, extra] {
            fixture
                .subpatch_in("subproject")
                .arg("apply")
                .arg(patch)
                .arg("-q")
                .assert()
                .success();
        }
        fixture.git(&["commit", "-q", "-m", "add patches"]);
        fixture
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
