//! # Git Primitives
//!
//! Thin wrappers around the system `git` binary. Every function runs exactly
//! one child process (or a few batched ones), waits for it and maps a
//! non-zero exit status to [`Error::GitCommand`].
//!
//! All functions take the directory git is executed in as their first
//! argument. Paths handed to git are interpreted relative to that directory.
//!
//! Git naming used throughout:
//!  - object: something in the object store that has a SHA1
//!  - object id: the hash of the object
//!  - ref: a name in the `refs` namespace, like branches and tags
//!  - revision: anything `git rev-parse` understands, e.g. a SHA1, `HEAD`
//!    or `main:file`

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::LazyLock;

use log::debug;
use regex::bytes::Regex;

use crate::defaults::{METADATA_FILENAME, PATCHES_DIRNAME};
use crate::error::{Error, Result};

/// Maximum number of paths handed to a single `git add` or `git rm` call.
pub const BATCH_SIZE: usize = 5000;

static SHA1_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("Invalid SHA1 regex"));

/// The type of an object in the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    fn from_bytes(name: &[u8]) -> Option<Self> {
        match name {
            b"blob" => Some(ObjectType::Blob),
            b"tree" => Some(ObjectType::Tree),
            b"commit" => Some(ObjectType::Commit),
            b"tag" => Some(ObjectType::Tag),
            _ => None,
        }
    }
}

/// Whether `git apply` adds or removes a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyDirection {
    Forward,
    Reverse,
}

/// One entry of a tree object as printed by `git ls-tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: Vec<u8>,
    pub kind: Vec<u8>,
    pub object_id: Vec<u8>,
    pub name: Vec<u8>,
}

fn git(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    cmd
}

fn describe(cmd: &Command) -> String {
    cmd.get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `cmd` and return its raw output regardless of the exit status.
fn execute(cmd: &mut Command) -> Result<Output> {
    debug!("Running git {} in {:?}", describe(cmd), cmd.get_current_dir());
    cmd.output().map_err(|e| Error::GitCommand {
        command: describe(cmd),
        stderr: e.to_string(),
    })
}

/// Run `cmd` and return its stdout. A non-zero exit status is an error.
fn run(cmd: &mut Command) -> Result<Vec<u8>> {
    let output = execute(cmd)?;
    if !output.status.success() {
        return Err(Error::GitCommand {
            command: describe(cmd),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }
    Ok(output.stdout)
}

fn stdout_line(stdout: Vec<u8>) -> String {
    String::from_utf8_lossy(&stdout).trim_end_matches('\n').to_string()
}

fn run_batched<P: AsRef<OsStr>>(dir: &Path, base_args: &[&str], paths: &[P]) -> Result<()> {
    for chunk in paths.chunks(BATCH_SIZE) {
        run(git(dir).args(base_args).args(chunk))?;
    }
    Ok(())
}

/// Add `paths` to the index.
///
/// Uses `-f`, otherwise git honors ignore files and silently skips parts of
/// a vendored tree.
pub fn add<P: AsRef<OsStr>>(dir: &Path, paths: &[P]) -> Result<()> {
    run_batched(dir, &["add", "-f"], paths)
}

/// Remove `paths` from the index and the working tree.
pub fn rm<P: AsRef<OsStr>>(dir: &Path, paths: &[P]) -> Result<()> {
    run_batched(dir, &["rm", "-q", "-f"], paths)
}

/// One-line summary of the staged changes. Empty if nothing is staged.
pub fn diff_staged_shortstat(dir: &Path) -> Result<String> {
    let stdout = run(git(dir).args(["diff", "--staged", "--shortstat"]))?;
    Ok(stdout_line(stdout).trim().to_string())
}

pub fn object_type(dir: &Path, object: &str) -> Result<ObjectType> {
    let stdout = run(git(dir).args(["cat-file", "-t", object]))?;
    let name = stdout.trim_ascii_end();
    ObjectType::from_bytes(name).ok_or_else(|| Error::GitCommand {
        command: format!("cat-file -t {}", object),
        stderr: format!("unknown object type '{}'", String::from_utf8_lossy(name)),
    })
}

/// Check whether `revision` resolves to a valid object in the repository.
pub fn verify(dir: &Path, revision: &str) -> Result<bool> {
    let mut cmd = git(dir);
    cmd.args(["rev-parse", "--quiet", "--verify"])
        .arg(format!("{}^{{object}}", revision));
    let output = execute(&mut cmd)?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(Error::GitCommand {
            command: describe(&cmd),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        }),
    }
}

/// Resolve `revision` to a full object id.
pub fn rev_parse(dir: &Path, revision: &str) -> Result<String> {
    let stdout = run(git(dir).args(["rev-parse", "-q", "--verify", revision]))?;
    Ok(stdout_line(stdout))
}

/// List the refs of the remote repository at `url`, as `ref name -> object id`.
///
/// The listing contains branches, tags, peeled tags (`^{}`) and `HEAD`.
pub fn ls_remote(dir: &Path, url: &OsStr) -> Result<BTreeMap<String, String>> {
    let stdout = run(git(dir).arg("ls-remote").arg(url))?;
    parse_sha1_names(&stdout, b'\t')
}

/// Parse lines of `<sha1><sep><name>` into a `name -> sha1` map.
///
/// `ls-remote` uses a tab as separator, `show-ref` a space.
pub fn parse_sha1_names(output: &[u8], sep: u8) -> Result<BTreeMap<String, String>> {
    let mut names = BTreeMap::new();
    for line in output.split(|&b| b == b'\n').filter(|l| !l.is_empty()) {
        let parts: Vec<&[u8]> = line.split(|&b| b == sep).collect();
        let [sha1, name] = parts.as_slice() else {
            return Err(Error::invalid_state(format!(
                "Parsing error in line: '{}'",
                String::from_utf8_lossy(line)
            )));
        };
        if !is_sha1(sha1) {
            return Err(Error::invalid_state(format!(
                "String is not a SHA1 sum: '{}'",
                String::from_utf8_lossy(sha1)
            )));
        }
        names.insert(
            String::from_utf8_lossy(name).into_owned(),
            String::from_utf8_lossy(sha1).into_owned(),
        );
    }
    Ok(names)
}

/// Resolve a short ref name against a remote ref listing.
///
/// Tries the literal name, then `refs/tags/<name>`, then `refs/heads/<name>`.
pub fn guess_remote_ref(refs: &BTreeMap<String, String>, name: &str) -> Option<String> {
    [
        name.to_string(),
        format!("refs/tags/{}", name),
        format!("refs/heads/{}", name),
    ]
    .into_iter()
    .find(|candidate| refs.contains_key(candidate))
}

pub fn clone(dir: &Path, url: &OsStr, folder: &Path) -> Result<()> {
    run(git(dir).args(["clone", "-q"]).arg(url).arg(folder))?;
    Ok(())
}

/// Create an empty repository in `dir`, fetch `reference` from `url` into it
/// and return the object id of the fetched head.
///
/// With `shallow` the fetch is limited to `--depth 1`. The dumb http
/// transport does not support that.
pub fn init_and_fetch(dir: &Path, url: &OsStr, reference: &str, shallow: bool) -> Result<String> {
    run(git(dir).args(["init", "-q"]))?;

    let mut cmd = git(dir);
    cmd.args(["fetch", "-q"]).arg(url).arg(reference);
    if shallow {
        cmd.args(["--depth", "1"]);
    }
    run(&mut cmd)?;

    let fetch_head = fs::read(dir.join(".git").join("FETCH_HEAD"))?;
    let sha1 = fetch_head
        .split(|&b| b == b'\t')
        .next()
        .unwrap_or_default();
    if !is_sha1(sha1) {
        return Err(Error::invalid_state(format!(
            "FETCH_HEAD does not start with a SHA1 sum: '{}'",
            String::from_utf8_lossy(sha1)
        )));
    }
    Ok(String::from_utf8_lossy(sha1).into_owned())
}

pub fn reset_hard(dir: &Path, revision: &str) -> Result<()> {
    run(git(dir).args(["reset", "-q", "--hard", revision]))?;
    Ok(())
}

fn apply_command<P: AsRef<Path>>(
    dir: &Path,
    subdir: &Path,
    patches: &[P],
    direction: ApplyDirection,
    check: bool,
) -> Command {
    let mut cmd = git(dir);
    cmd.arg("apply");
    if check {
        cmd.arg("--check");
    }
    if direction == ApplyDirection::Reverse {
        cmd.arg("--reverse");
    }
    cmd.arg("--index")
        .arg(format!("--directory={}", subdir.display()));
    cmd.args(patches.iter().map(|p| p.as_ref().as_os_str()));
    cmd
}

/// Apply `patches` to the index and the working tree below `subdir`.
///
/// All patches are handed to a single `git apply` call. Git applies them in
/// the given order.
pub fn apply<P: AsRef<Path>>(
    dir: &Path,
    subdir: &Path,
    patches: &[P],
    direction: ApplyDirection,
) -> Result<()> {
    run(&mut apply_command(dir, subdir, patches, direction, false))?;
    Ok(())
}

/// Check whether `patches` would apply cleanly. Nothing is modified.
pub fn apply_check<P: AsRef<Path>>(
    dir: &Path,
    subdir: &Path,
    patches: &[P],
    direction: ApplyDirection,
) -> Result<bool> {
    let mut cmd = apply_command(dir, subdir, patches, direction, true);
    let output = execute(&mut cmd)?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => Err(Error::GitCommand {
            command: describe(&cmd),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        }),
    }
}

/// Write the index below `prefix` as a tree object and return its id.
pub fn write_tree(dir: &Path, prefix: &Path) -> Result<String> {
    let mut cmd = git(dir);
    cmd.arg("write-tree");
    if !prefix.as_os_str().is_empty() {
        cmd.arg(format!("--prefix={}/", prefix.display()));
    }
    Ok(stdout_line(run(&mut cmd)?))
}

/// List the direct entries of the tree `tree`.
pub fn ls_tree(dir: &Path, tree: &str) -> Result<Vec<TreeEntry>> {
    let stdout = run(git(dir).args(["ls-tree", "-z", tree]))?;
    parse_z(&stdout)
        .into_iter()
        .map(|record| {
            let mut info_name = record.splitn(2, |&b| b == b'\t');
            let info = info_name.next().unwrap_or_default();
            let name = info_name.next();
            let fields: Vec<&[u8]> = info.split(|&b| b == b' ').collect();
            match (fields.as_slice(), name) {
                ([mode, kind, object_id], Some(name)) => Ok(TreeEntry {
                    mode: mode.to_vec(),
                    kind: kind.to_vec(),
                    object_id: object_id.to_vec(),
                    name: name.to_vec(),
                }),
                _ => Err(Error::invalid_state(format!(
                    "Cannot parse ls-tree record '{}'",
                    String::from_utf8_lossy(record)
                ))),
            }
        })
        .collect()
}

/// Store raw tree object data and return the id of the new tree.
pub fn hash_object_tree(dir: &Path, data: &[u8]) -> Result<String> {
    let mut cmd = git(dir);
    cmd.args(["hash-object", "-w", "-t", "tree", "--stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let command = describe(&cmd);
    debug!("Running git {} in {:?}", command, dir);

    let mut child = cmd.spawn().map_err(|e| Error::GitCommand {
        command: command.clone(),
        stderr: e.to_string(),
    })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(data)?;
    }
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(Error::GitCommand {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }
    Ok(stdout_line(output.stdout))
}

/// Build the binary representation of tree object entries.
///
/// Each entry is `<mode> <name>\0<20 raw bytes of the object id>`. Git
/// writes tree modes without a leading zero.
pub fn encode_tree(entries: &[TreeEntry]) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for entry in entries {
        let mode = match entry.mode.as_slice() {
            b"040000" => b"40000".as_slice(),
            mode => mode,
        };
        let raw_id = hex::decode(&entry.object_id).map_err(|e| {
            Error::invalid_state(format!(
                "Invalid object id '{}': {}",
                String::from_utf8_lossy(&entry.object_id),
                e
            ))
        })?;
        data.extend_from_slice(mode);
        data.push(b' ');
        data.extend_from_slice(&entry.name);
        data.push(0);
        data.extend_from_slice(&raw_id);
    }
    Ok(data)
}

/// Hash of `tree` without the subproject's own bookkeeping entries.
///
/// The `patches` directory and the metadata file are removed from the top
/// level of the tree before it is hashed again.
pub fn strip_tree_object(dir: &Path, tree: &str) -> Result<String> {
    let entries: Vec<TreeEntry> = ls_tree(dir, tree)?
        .into_iter()
        .filter(|entry| {
            entry.name != PATCHES_DIRNAME.as_bytes() && entry.name != METADATA_FILENAME.as_bytes()
        })
        .collect();
    hash_object_tree(dir, &encode_tree(&entries)?)
}

/// Diff between two tree objects, optionally as a diffstat.
pub fn diff_trees(dir: &Path, from: &str, to: &str, stat: bool) -> Result<Vec<u8>> {
    let mut cmd = git(dir);
    cmd.args(["diff", from, to]);
    if stat {
        cmd.arg("--stat");
    }
    run(&mut cmd)
}

/// Names of changed files, relative to the toplevel directory.
///
/// Without `staged` the working tree is compared against the index, with it
/// the index against `HEAD`. `subdir` limits the listing to one directory.
pub fn diff_name_only(dir: &Path, staged: bool, subdir: Option<&Path>) -> Result<Vec<String>> {
    let mut cmd = git(dir);
    cmd.args(["diff", "--name-only", "-z"]);
    if staged {
        cmd.arg("--staged");
    }
    if let Some(subdir) = subdir {
        cmd.arg("--").arg(subdir);
    }
    Ok(lossy(parse_z(&run(&mut cmd)?)))
}

/// Tracked files below `dir`, relative to `dir`.
pub fn ls_files(dir: &Path) -> Result<Vec<String>> {
    Ok(lossy(parse_z(&run(git(dir).args(["ls-files", "-z"]))?)))
}

/// Untracked files and directories, relative to the toplevel directory.
///
/// Directories that only contain ignored files are skipped.
pub fn ls_files_untracked(dir: &Path) -> Result<Vec<String>> {
    let stdout = run(git(dir).args([
        "ls-files",
        "--exclude-standard",
        "-o",
        "--directory",
        "-z",
        "--full-name",
        "--no-empty-directory",
    ]))?;
    Ok(lossy(parse_z(&stdout)))
}

fn lossy(items: Vec<&[u8]>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| String::from_utf8_lossy(item).into_owned())
        .collect()
}

/// Split the NUL-terminated output of a `-z` git command.
pub fn parse_z(output: &[u8]) -> Vec<&[u8]> {
    if output.is_empty() {
        return Vec::new();
    }
    let output = output.strip_suffix(b"\0").unwrap_or(output);
    output.split(|&b| b == 0).collect()
}

/// Whether `value` is a full, lower-case hex SHA1.
pub fn is_sha1(value: &[u8]) -> bool {
    SHA1_PATTERN.is_match(value)
}

/// Reject revisions containing characters no ref name may contain.
pub fn is_valid_revision(revision: &str) -> bool {
    !revision.contains(['\t', '\n', '\u{8}'])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA_A: &str = "32c3bf2b03bc1e5f8e3e40eb9b7d2cdfb0e3f202";
    const SHA_B: &str = "e5f5d8bbd5a1c7c43e1a1d5d1e94be6f4b3e8b31";

    #[test]
    fn test_is_sha1() {
        assert!(is_sha1(SHA_A.as_bytes()));
        assert!(!is_sha1(b""));
        assert!(!is_sha1(&SHA_A.as_bytes()[..39]));
        assert!(!is_sha1(SHA_A.to_uppercase().as_bytes()));
        assert!(!is_sha1(b"g2c3bf2b03bc1e5f8e3e40eb9b7d2cdfb0e3f202"));
    }

    #[test]
    fn test_is_valid_revision() {
        assert!(is_valid_revision("main"));
        assert!(is_valid_revision("v1.0"));
        assert!(!is_valid_revision("ma\tin"));
        assert!(!is_valid_revision("main\n"));
        assert!(!is_valid_revision("ma\u{8}in"));
    }

    #[test]
    fn test_parse_z() {
        assert!(parse_z(b"").is_empty());
        assert_eq!(parse_z(b"a\0"), vec![b"a".as_slice()]);
        assert_eq!(parse_z(b"a\0b c\0"), vec![b"a".as_slice(), b"b c".as_slice()]);
    }

    #[test]
    fn test_parse_sha1_names() {
        let output = format!("{}\tHEAD\n{}\trefs/heads/main\n{}\trefs/tags/v1\n", SHA_A, SHA_A, SHA_B);
        let names = parse_sha1_names(output.as_bytes(), b'\t').unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names["refs/tags/v1"], SHA_B);
        assert_eq!(names["HEAD"], SHA_A);
    }

    #[test]
    fn test_parse_sha1_names_ignores_empty_lines() {
        let output = format!("\n{} refs/heads/main\n\n", SHA_A);
        let names = parse_sha1_names(output.as_bytes(), b' ').unwrap();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_parse_sha1_names_errors() {
        assert!(parse_sha1_names(b"no-separator\n", b'\t').is_err());
        assert!(parse_sha1_names(b"1234\trefs/heads/main\n", b'\t').is_err());
    }

    #[test]
    fn test_guess_remote_ref_order() {
        let mut refs = BTreeMap::new();
        refs.insert("refs/heads/v1".to_string(), SHA_A.to_string());
        refs.insert("refs/tags/v1".to_string(), SHA_B.to_string());
        refs.insert("refs/heads/main".to_string(), SHA_A.to_string());

        assert_eq!(guess_remote_ref(&refs, "v1").as_deref(), Some("refs/tags/v1"));
        assert_eq!(guess_remote_ref(&refs, "main").as_deref(), Some("refs/heads/main"));
        assert_eq!(
            guess_remote_ref(&refs, "refs/heads/v1").as_deref(),
            Some("refs/heads/v1")
        );
        assert_eq!(guess_remote_ref(&refs, "unknown"), None);
    }

    #[test]
    fn test_encode_tree() {
        let entries = vec![
            TreeEntry {
                mode: b"100644".to_vec(),
                kind: b"blob".to_vec(),
                object_id: SHA_A.as_bytes().to_vec(),
                name: b"a".to_vec(),
            },
            TreeEntry {
                mode: b"040000".to_vec(),
                kind: b"tree".to_vec(),
                object_id: SHA_B.as_bytes().to_vec(),
                name: b"dir".to_vec(),
            },
        ];
        let data = encode_tree(&entries).unwrap();

        let mut expected = b"100644 a\0".to_vec();
        expected.extend(hex::decode(SHA_A).unwrap());
        expected.extend_from_slice(b"40000 dir\0");
        expected.extend(hex::decode(SHA_B).unwrap());
        assert_eq!(data, expected);
    }

    #[test]
    fn test_encode_tree_rejects_bad_object_id() {
        let entries = vec![TreeEntry {
            mode: b"100644".to_vec(),
            kind: b"blob".to_vec(),
            object_id: b"xyz".to_vec(),
            name: b"a".to_vec(),
        }];
        assert!(matches!(
            encode_tree(&entries),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_object_type_from_bytes() {
        assert_eq!(ObjectType::from_bytes(b"commit"), Some(ObjectType::Commit));
        assert_eq!(ObjectType::from_bytes(b"tag"), Some(ObjectType::Tag));
        assert_eq!(ObjectType::from_bytes(b"blob"), Some(ObjectType::Blob));
        assert_eq!(ObjectType::from_bytes(b"tree"), Some(ObjectType::Tree));
        assert_eq!(ObjectType::from_bytes(b"other"), None);
    }
}
