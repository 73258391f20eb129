//! # Config Text Engine
//!
//! Reader and writer for the git-config style text format used by the
//! `.subpatch` and `.subproject` files.
//!
//! The file is parsed into a lazy, single-pass stream of [`ConfigLine`]s.
//! Every line keeps its verbatim original bytes, so concatenating the
//! original bytes of an untouched stream reproduces the input exactly:
//!
//! ```
//! use subpatch::config::{parse, ConfigLines};
//!
//! let text = b"[upstream]\n\turl = ../sub\n# comment\n";
//! assert_eq!(parse(text).unparse().unwrap(), text.to_vec());
//! ```
//!
//! Edits are stream combinators provided by the [`ConfigLines`] extension
//! trait. Each one consumes a stream and yields a new one, so several edits
//! compose into a single pass over the file:
//!
//! ```
//! use subpatch::config::{parse, ConfigLines};
//!
//! let text = parse(b"[section]\na=1\nc=3\n")
//!     .set_key_value("section", "b", "2")
//!     .unparse()
//!     .unwrap();
//! assert_eq!(text, b"[section]\na=1\n\tb = 2\nc=3\n".to_vec());
//! ```
//!
//! Synthesized lines are inserted before the first greater section or key.
//! Repeated use therefore keeps sections and keys in ascending byte order,
//! which keeps the diffs of the metadata files small. A line appended after
//! a last line without `\n` is preceded by a bare `\n`, so the two never
//! run together.
//!
//! Not supported: `[section.subsection]` syntax, continuation lines,
//! comments at the end of a line and escaped quotes in subsection names.
//! No syntax errors are detected; a malformed line is accepted as whatever
//! kind it superficially resembles.

use std::collections::VecDeque;
use std::iter::Fuse;

use crate::error::{Error, Result};

/// The kind of a line together with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    Comment,
    /// A section header like `[name]` or `[name "sub"]`.
    Header {
        section: Vec<u8>,
        subsection: Option<Vec<u8>>,
    },
    /// A `key = value` line. Both parts are trimmed.
    KeyValue { key: Vec<u8>, value: Vec<u8> },
}

/// One physical line of a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    /// The verbatim bytes, including the line terminator if there was one.
    pub orig: Vec<u8>,
    pub kind: LineKind,
}

impl ConfigLine {
    /// Synthesize a `[name]` header line.
    pub fn header(section: &[u8]) -> Self {
        let mut orig = Vec::with_capacity(section.len() + 3);
        orig.push(b'[');
        orig.extend_from_slice(section);
        orig.extend_from_slice(b"]\n");
        ConfigLine {
            orig,
            kind: LineKind::Header {
                section: section.to_vec(),
                subsection: None,
            },
        }
    }

    /// Synthesize a tab-indented `key = value` line.
    pub fn key_value(key: &[u8], value: &[u8]) -> Self {
        let mut orig = Vec::with_capacity(key.len() + value.len() + 5);
        orig.push(b'\t');
        orig.extend_from_slice(key);
        orig.extend_from_slice(b" = ");
        orig.extend_from_slice(value);
        orig.push(b'\n');
        ConfigLine {
            orig,
            kind: LineKind::KeyValue {
                key: key.to_vec(),
                value: value.to_vec(),
            },
        }
    }

    /// Synthesize a bare line terminator.
    pub fn newline() -> Self {
        ConfigLine {
            orig: b"\n".to_vec(),
            kind: LineKind::Empty,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.orig.ends_with(b"\n")
    }

    /// Classify a single line. `line` may or may not end with `\n`.
    pub fn parse(line: &[u8]) -> Self {
        let kind = match line.trim_ascii_start().first() {
            None => LineKind::Empty,
            Some(b'#') | Some(b';') => LineKind::Comment,
            Some(b'[') => parse_header(line),
            Some(_) => parse_key_value(line),
        };
        ConfigLine {
            orig: line.to_vec(),
            kind,
        }
    }

    /// Whether this line is the header of the top-level section `name`.
    pub fn is_section(&self, name: &[u8]) -> bool {
        matches!(&self.kind, LineKind::Header { section, subsection: None } if section == name)
    }

    pub fn is_header(&self) -> bool {
        matches!(self.kind, LineKind::Header { .. })
    }
}

fn parse_header(line: &[u8]) -> LineKind {
    let after_bracket = match line.iter().position(|&b| b == b'[') {
        Some(pos) => &line[pos + 1..],
        None => line,
    };
    let inner = after_bracket.split(|&b| b == b']').next().unwrap_or_default();

    let mut parts = inner.splitn(3, |&b| b == b'"');
    let name = parts.next().unwrap_or_default();
    match parts.next() {
        // [section "subsection"]
        Some(subsection) => LineKind::Header {
            section: name.trim_ascii().to_vec(),
            subsection: Some(subsection.to_vec()),
        },
        None => LineKind::Header {
            section: inner.to_vec(),
            subsection: None,
        },
    }
}

fn parse_key_value(line: &[u8]) -> LineKind {
    let mut parts = line.splitn(2, |&b| b == b'=');
    let key = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default();
    LineKind::KeyValue {
        key: key.trim_ascii().to_vec(),
        value: value.trim_ascii().to_vec(),
    }
}

/// Split bytes into lines, keeping the `\n` terminator on each line.
///
/// Only the last line may lack a terminator. Empty input yields no lines.
pub fn split_lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content.split_inclusive(|&b| b == b'\n')
}

/// Parse raw bytes into a lazy stream of config lines.
///
/// Parsing itself never fails. The stream carries `Result`s so that edits
/// further down the chain can report their own errors in-band.
pub fn parse(content: &[u8]) -> impl Iterator<Item = Result<ConfigLine>> + '_ {
    parse_lines(split_lines(content))
}

/// Parse already split lines. See [`parse`].
pub fn parse_lines<'a, I>(lines: I) -> impl Iterator<Item = Result<ConfigLine>> + 'a
where
    I: IntoIterator<Item = &'a [u8]>,
    I::IntoIter: 'a,
{
    lines.into_iter().map(|line| Ok(ConfigLine::parse(line)))
}

/// An empty stream, for files that do not exist yet.
pub fn empty() -> impl Iterator<Item = Result<ConfigLine>> {
    std::iter::empty()
}

/// Return `line` for emission at the end of a stream.
///
/// If the previous line had no terminator, a bare newline is returned
/// instead and `line` is parked in `pending`.
fn append_at_end(line: ConfigLine, last_terminated: bool, pending: &mut Option<ConfigLine>) -> ConfigLine {
    if last_terminated {
        return line;
    }
    *pending = Some(line);
    ConfigLine::newline()
}

/// Concatenate the original bytes of every line.
pub fn unparse<I>(lines: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Result<ConfigLine>>,
{
    let mut out = Vec::new();
    for line in lines {
        out.extend_from_slice(&line?.orig);
    }
    Ok(out)
}

/// Edit combinators for streams of config lines.
pub trait ConfigLines: Iterator<Item = Result<ConfigLine>> + Sized {
    /// Ensure a top-level section `name` exists.
    ///
    /// An existing section is left untouched. A missing one is inserted just
    /// before the first top-level section with a greater name, or appended.
    fn add_section(self, name: impl AsRef<[u8]>) -> AddSection<Self> {
        AddSection {
            inner: self.fuse(),
            line: Some(ConfigLine::header(name.as_ref())),
            name: name.as_ref().to_vec(),
            pending: None,
            terminated: true,
        }
    }

    /// Set `key` to `value` in `section`, replacing the first occurrence of
    /// the key in place and dropping all other occurrences.
    ///
    /// The section must exist. Otherwise the stream ends with an error.
    fn set_key_value(
        self,
        section: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> SetKeyValue<Self> {
        SetKeyValue::new(self, section.as_ref(), key.as_ref(), value.as_ref(), false)
    }

    /// Add another `key = value` line to `section`, keeping existing lines of
    /// the same key. Values of the key stay in ascending order.
    ///
    /// The section must exist. Otherwise the stream ends with an error.
    fn append_key_value(
        self,
        section: impl AsRef<[u8]>,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> SetKeyValue<Self> {
        SetKeyValue::new(self, section.as_ref(), key.as_ref(), value.as_ref(), true)
    }

    /// Remove every `key` line inside `section`.
    ///
    /// A missing section is not an error; the stream passes through.
    fn drop_key(self, section: impl AsRef<[u8]>, key: impl AsRef<[u8]>) -> DropKey<Self> {
        DropKey {
            inner: self,
            section: section.as_ref().to_vec(),
            key: key.as_ref().to_vec(),
            in_section: false,
        }
    }

    /// Remove the header of `section` if the section has no key-value lines.
    fn drop_section_if_empty(self, section: impl AsRef<[u8]>) -> DropSectionIfEmpty<Self> {
        DropSectionIfEmpty {
            inner: self,
            section: section.as_ref().to_vec(),
            in_section: false,
            held: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    fn unparse(self) -> Result<Vec<u8>> {
        unparse(self)
    }
}

impl<I: Iterator<Item = Result<ConfigLine>>> ConfigLines for I {}

/// Boxed stream, for edits that are chosen at runtime.
pub type BoxedLines<'a> = Box<dyn Iterator<Item = Result<ConfigLine>> + 'a>;

/// Stream adapter returned by [`ConfigLines::add_section`].
pub struct AddSection<I> {
    inner: Fuse<I>,
    name: Vec<u8>,
    /// The header still to be emitted. `None` once emitted or found.
    line: Option<ConfigLine>,
    pending: Option<ConfigLine>,
    /// Whether the last line read from `inner` ends with `\n`.
    terminated: bool,
}

impl<I: Iterator<Item = Result<ConfigLine>>> Iterator for AddSection<I> {
    type Item = Result<ConfigLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.pending.take() {
            return Some(Ok(line));
        }

        let line = match self.inner.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Some(Err(e)),
            None => {
                let header = self.line.take()?;
                return Some(Ok(append_at_end(header, self.terminated, &mut self.pending)));
            }
        };
        self.terminated = line.is_terminated();

        if let LineKind::Header {
            section,
            subsection: None,
        } = &line.kind
        {
            if *section == self.name {
                self.line = None;
            } else if *section > self.name {
                if let Some(header) = self.line.take() {
                    self.pending = Some(line);
                    return Some(Ok(header));
                }
            }
        }
        Some(Ok(line))
    }
}

/// Stream adapter returned by [`ConfigLines::set_key_value`] and
/// [`ConfigLines::append_key_value`].
pub struct SetKeyValue<I> {
    inner: I,
    section: Vec<u8>,
    key: Vec<u8>,
    value: Vec<u8>,
    append: bool,
    in_section: bool,
    /// The key-value line still to be emitted. `None` once emitted.
    line: Option<ConfigLine>,
    pending: Option<ConfigLine>,
    finished: bool,
    /// Whether the last line read from `inner` ends with `\n`.
    terminated: bool,
}

impl<I> SetKeyValue<I> {
    fn new(inner: I, section: &[u8], key: &[u8], value: &[u8], append: bool) -> Self {
        SetKeyValue {
            inner,
            section: section.to_vec(),
            key: key.to_vec(),
            value: value.to_vec(),
            append,
            in_section: false,
            line: Some(ConfigLine::key_value(key, value)),
            pending: None,
            finished: false,
            terminated: true,
        }
    }

    /// Emit the new line (if not done yet) and hold `line` back for the next
    /// call.
    fn emit_before(&mut self, line: ConfigLine) -> ConfigLine {
        match self.line.take() {
            Some(new_line) => {
                self.pending = Some(line);
                new_line
            }
            None => line,
        }
    }
}

impl<I: Iterator<Item = Result<ConfigLine>>> Iterator for SetKeyValue<I> {
    type Item = Result<ConfigLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.pending.take() {
            return Some(Ok(line));
        }

        loop {
            let line = match self.inner.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    if self.finished {
                        return None;
                    }
                    self.finished = true;
                    if self.in_section {
                        self.in_section = false;
                        let line = self.line.take()?;
                        return Some(Ok(append_at_end(line, self.terminated, &mut self.pending)));
                    }
                    if self.line.is_some() {
                        return Some(Err(Error::invalid_state(format!(
                            "No section with name '{}' found!",
                            String::from_utf8_lossy(&self.section)
                        ))));
                    }
                    return None;
                }
            };
            self.terminated = line.is_terminated();

            if !self.in_section {
                if line.is_section(&self.section) {
                    self.in_section = true;
                }
                return Some(Ok(line));
            }

            match &line.kind {
                LineKind::Header { .. } => {
                    // The section ends here
                    self.in_section = false;
                    return Some(Ok(self.emit_before(line)));
                }
                LineKind::KeyValue { key, value } if *key == self.key => {
                    if !self.append {
                        // Replace the first occurrence, drop the others
                        match self.line.take() {
                            Some(new_line) => return Some(Ok(new_line)),
                            None => continue,
                        }
                    }
                    if *value > self.value {
                        return Some(Ok(self.emit_before(line)));
                    }
                    return Some(Ok(line));
                }
                LineKind::KeyValue { key, .. } if *key > self.key => {
                    return Some(Ok(self.emit_before(line)));
                }
                _ => return Some(Ok(line)),
            }
        }
    }
}

/// Stream adapter returned by [`ConfigLines::drop_key`].
pub struct DropKey<I> {
    inner: I,
    section: Vec<u8>,
    key: Vec<u8>,
    in_section: bool,
}

impl<I: Iterator<Item = Result<ConfigLine>>> Iterator for DropKey<I> {
    type Item = Result<ConfigLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.inner.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };

            if !self.in_section {
                self.in_section = line.is_section(&self.section);
                return Some(Ok(line));
            }

            match &line.kind {
                LineKind::Header { .. } => {
                    self.in_section = false;
                    return Some(Ok(line));
                }
                LineKind::KeyValue { key, .. } if *key == self.key => continue,
                _ => return Some(Ok(line)),
            }
        }
    }
}

/// Stream adapter returned by [`ConfigLines::drop_section_if_empty`].
pub struct DropSectionIfEmpty<I> {
    inner: I,
    section: Vec<u8>,
    in_section: bool,
    /// Header of the matching section and the non key-value lines after it,
    /// held back until the first key shows up.
    held: Vec<ConfigLine>,
    ready: VecDeque<ConfigLine>,
}

impl<I> DropSectionIfEmpty<I> {
    /// Release the held lines. Without `keep_header` the header is dropped.
    fn release(&mut self, keep_header: bool) {
        let mut held = std::mem::take(&mut self.held).into_iter();
        if !keep_header {
            held.next();
        }
        self.ready.extend(held);
    }
}

impl<I: Iterator<Item = Result<ConfigLine>>> Iterator for DropSectionIfEmpty<I> {
    type Item = Result<ConfigLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }

            let line = match self.inner.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e)),
                None if self.held.is_empty() => return None,
                None => {
                    self.in_section = false;
                    self.release(false);
                    continue;
                }
            };

            if !self.in_section {
                if line.is_section(&self.section) {
                    self.in_section = true;
                    self.held.push(line);
                    continue;
                }
                return Some(Ok(line));
            }

            match &line.kind {
                LineKind::Header { .. } => {
                    self.in_section = false;
                    // Lines are still held only if no key was seen
                    let section_is_empty = !self.held.is_empty();
                    self.release(!section_is_empty);
                    self.ready.push_back(line);
                }
                LineKind::KeyValue { .. } => {
                    self.release(true);
                    self.ready.push_back(line);
                }
                _ if !self.held.is_empty() => self.held.push(line),
                _ => return Some(Ok(line)),
            }
        }
    }
}
