//! End-to-end tests for the `status` command.

mod common;
use common::prelude::*;

#[test]
fn test_status_without_subprojects() {
    let fixture = TestFixture::new();
    fixture.subpatch().arg("configure").assert().success();

    fixture.subpatch().arg("status").assert().success().stdout("");
}

#[test]
fn test_status_clean_subproject() {
    let fixture = TestFixture::new().with_subproject();
    let object_id = git(&fixture.upstream(), &["rev-parse", "v1"]);

    fixture
        .subpatch()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!(
            "NOTE: The format of the output is human-readable and unstable. Do not use in scripts!\n\
             NOTE: The format is markdown currently. Will mostly change in the future.\n\
             \n\
             # subproject at 'subproject'\n\
             \n\
             * was integrated from URL: ../subproject\n\
             * has integrated revision: v1\n\
             * has integrated object id: {}\n",
            object_id.trim()
        )));
}

#[test]
fn test_status_changes_and_patches() {
    let fixture = TestFixture::new().with_patches();
    fixture.subpatch_in("subproject").args(["pop", "-q"]).assert().success();
    fixture.child("subproject/untracked").write_str("x\n").unwrap();
    fixture.child("subproject/hello").write_str("unstaged\n").unwrap();

    fixture
        .subpatch()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("* There are n=1 untracked files and/or directories:\n"))
        .stdout(predicate::str::contains("* There are n=1 modified files not staged for commit:\n"))
        .stdout(predicate::str::contains(
            "* There are n=2 modified files that are staged, but not committed:\n",
        ))
        .stdout(predicate::str::contains(
            "* There are n=2 patches.\n* There are only n=1 patches applied.\n",
        ));
}

#[test]
fn test_status_outside_toplevel_warns() {
    let fixture = TestFixture::new().with_subproject();

    fixture
        .subpatch_in("subproject")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "WARNING: The current working directory is not the toplevel directory of the superproject.\n",
        ));
}
