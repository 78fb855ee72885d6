//! Text block format for the metadata store
//!
//! A small, hand-written subset of YAML with exactly one shape:
//!
//! ```text
//! versions:
//!   <version-name>:
//!     items:
//!     - key: <k>
//!       section: <s>
//!       name_zh: <n>
//!       description_zh: |
//!         first line
//!         second line
//! ```
//!
//! A bare top-level list of `- key: ...` items (the legacy shape) loads into
//! a version named [`DEFAULT_VERSION`]. The parser is lenient: lines it does
//! not understand are skipped and reported as [`ParseWarning`]s.
//!
//! Input is pre-tokenized into `(indent, text)` lines, so validating a
//! version header by looking ahead at the next line is plain indexing.

use std::fmt;
use std::path::Path;

use super::backing::{BackingKind, MetadataBacking};
use super::error::StoreResult;
use super::fsio::{read_text, write_atomic};
use crate::domain::{MetadataItem, VersionedMetadataStore, DEFAULT_VERSION};

const VERSION_INDENT: usize = 2;
const ITEMS_INDENT: usize = 4;
const ITEM_INDENT: usize = 4;
const FIELD_INDENT: usize = ITEM_INDENT + 2;
const BLOCK_INDENT: usize = FIELD_INDENT + 2;

/// Why a line was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// Line does not fit the expected shape
    Unrecognized,
    /// Field name other than `key`, `section`, `name_zh`, `description_zh`
    UnknownField(String),
    /// Item without a key, dropped
    MissingKey,
}

/// A recoverable problem found while parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number
    pub line: usize,
    pub kind: WarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::Unrecognized => write!(f, "line {}: unrecognized line skipped", self.line),
            WarningKind::UnknownField(name) => {
                write!(f, "line {}: unknown field '{}' ignored", self.line, name)
            }
            WarningKind::MissingKey => write!(f, "line {}: item without key dropped", self.line),
        }
    }
}

/// Parser output: the store plus anything that was skipped
#[derive(Debug, Clone, Default)]
pub struct ParsedMetadata {
    pub store: VersionedMetadataStore,
    pub warnings: Vec<ParseWarning>,
}

struct Line<'a> {
    number: usize,
    indent: usize,
    raw: &'a str,
    text: &'a str,
}

impl Line<'_> {
    fn is_skippable(&self) -> bool {
        self.text.is_empty() || self.text.starts_with('#')
    }
}

fn tokenize(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .enumerate()
        .map(|(idx, raw)| Line {
            number: idx + 1,
            indent: raw.len() - raw.trim_start_matches(' ').len(),
            raw,
            text: raw.trim(),
        })
        .collect()
}

fn next_significant(lines: &[Line<'_>], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&i| !lines[i].is_skippable())
}

fn is_items_line(text: &str) -> bool {
    text == "items:" || text == "items: []"
}

/// Recognizes `  <name>:` followed (past blanks and comments) by `    items:`.
/// Returns the version name and the index of the `items:` line. When the
/// lookahead fails nothing is consumed.
fn version_header(lines: &[Line<'_>], idx: usize) -> Option<(String, usize)> {
    let line = &lines[idx];
    if line.indent != VERSION_INDENT || line.text.starts_with('-') {
        return None;
    }
    let name = line.text.strip_suffix(':')?;

    let next = next_significant(lines, idx + 1)?;
    let items = &lines[next];
    if items.indent != ITEMS_INDENT || !is_items_line(items.text) {
        return None;
    }

    let name = unquote(name.trim());
    (!name.is_empty()).then_some((name, next))
}

/// Splits `name: value` on the first colon into the name and the value
/// as written, still quoted
fn split_field(text: &str) -> Option<(&str, &str)> {
    let colon = text.find(':')?;
    let name = text[..colon].trim();
    if name.is_empty() {
        return None;
    }
    Some((name, text[colon + 1..].trim()))
}

fn is_block_indicator(value: &str) -> bool {
    matches!(value, "|" | ">" | "|-" | ">-" | "|+" | ">+")
}

/// Removes matching surrounding quotes. Double-quoted strings have their
/// backslash escapes resolved; single-quoted strings their doubled quotes.
fn unquote(value: &str) -> String {
    if value.len() >= 2 {
        if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
            return unescape_double(inner);
        }
        if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
            return inner.replace("''", "'");
        }
    }
    value.to_string()
}

fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

struct OpenItem {
    item: MetadataItem,
    indent: usize,
    line: usize,
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    store: VersionedMetadataStore,
    warnings: Vec<ParseWarning>,
    version: Option<String>,
    open: Option<OpenItem>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: tokenize(text),
            store: VersionedMetadataStore::new(),
            warnings: Vec::new(),
            version: None,
            open: None,
        }
    }

    fn warn(&mut self, line: usize, kind: WarningKind) {
        self.warnings.push(ParseWarning { line, kind });
    }

    fn flush(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        if open.item.key.is_empty() {
            self.warn(open.line, WarningKind::MissingKey);
            return;
        }
        let version = self
            .version
            .get_or_insert_with(|| DEFAULT_VERSION.to_string())
            .clone();
        self.store.insert_into(&version, open.item);
    }

    fn run(mut self) -> ParsedMetadata {
        let mut idx = 0;
        while idx < self.lines.len() {
            idx = self.step(idx);
        }
        self.flush();

        ParsedMetadata {
            store: self.store,
            warnings: self.warnings,
        }
    }

    /// Handles the line at `idx` and returns the index of the next line to read
    fn step(&mut self, idx: usize) -> usize {
        let line = &self.lines[idx];
        if line.is_skippable() {
            return idx + 1;
        }
        let (number, indent, text) = (line.number, line.indent, line.text);

        if let Some((name, items_idx)) = version_header(&self.lines, idx) {
            self.flush();
            self.store.add_version(&name);
            self.version = Some(name);
            return items_idx + 1;
        }

        if indent == 0 && (text == "versions:" || text == "versions: {}") {
            self.flush();
            return idx + 1;
        }

        if let Some(rest) = text.strip_prefix('-') {
            self.flush();
            self.open = Some(OpenItem {
                item: MetadataItem::default(),
                indent,
                line: number,
            });
            let rest = rest.trim();
            if rest.is_empty() {
                return idx + 1;
            }
            // Fields after the dash sit two columns right of it
            return self.field(idx, rest, indent + 2);
        }

        let inside_item = self.open.as_ref().is_some_and(|open| indent > open.indent);
        if inside_item {
            return self.field(idx, text, indent);
        }

        self.flush();
        self.warn(number, WarningKind::Unrecognized);
        idx + 1
    }

    /// Applies `name: value` to the open item. Block scalars consume their
    /// continuation lines.
    fn field(&mut self, idx: usize, text: &str, field_indent: usize) -> usize {
        let number = self.lines[idx].number;
        let Some((name, written)) = split_field(text) else {
            self.warn(number, WarningKind::Unrecognized);
            return idx + 1;
        };

        // Only a bare indicator opens a block; `"|"` is the literal text
        let mut next = idx + 1;
        let value = if name == "description_zh" && is_block_indicator(written) {
            let (block, after) = self.block_scalar(idx + 1, field_indent + 2);
            next = after;
            block
        } else {
            unquote(written)
        };

        if !matches!(name, "key" | "section" | "name_zh" | "description_zh") {
            self.warn(number, WarningKind::UnknownField(name.to_string()));
            return next;
        }
        if let Some(open) = self.open.as_mut() {
            let slot = match name {
                "key" => &mut open.item.key,
                "section" => &mut open.item.section,
                "name_zh" => &mut open.item.name,
                _ => &mut open.item.description,
            };
            *slot = value;
        }
        next
    }

    /// Collects lines indented at least `min_indent` (or blank), joined by
    /// newlines with trailing blank lines dropped
    fn block_scalar(&self, from: usize, min_indent: usize) -> (String, usize) {
        let mut collected: Vec<&str> = Vec::new();
        let mut idx = from;
        while let Some(line) = self.lines.get(idx) {
            if !line.text.is_empty() && line.indent < min_indent {
                break;
            }
            collected.push(line.raw.trim_start().trim_end_matches(char::is_control));
            idx += 1;
        }

        while collected.last().is_some_and(|l| l.trim().is_empty()) {
            collected.pop();
        }
        (collected.join("\n"), idx)
    }
}

/// Parses the block format. Never fails.
pub fn parse_metadata(text: &str) -> ParsedMetadata {
    Parser::new(text).run()
}

fn needs_quotes(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        '"', '\'', '[', ']', '{', '}', '&', '*', '!', '%', '@', '`', '|', '>', '-', '?',
    ];

    value.is_empty()
        || value.contains([':', '#', '\n', '\r', '\t'])
        || value.starts_with(' ')
        || value.ends_with(' ')
        || value.starts_with(INDICATORS)
}

/// Formats a scalar, double-quoting and escaping it when needed
pub fn format_scalar(value: &str) -> String {
    if !needs_quotes(value) {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn push_field(out: &mut String, name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push_str(&" ".repeat(FIELD_INDENT));
    out.push_str(name);
    out.push_str(": ");
    out.push_str(&format_scalar(value));
    out.push('\n');
}

fn push_item(out: &mut String, item: &MetadataItem) {
    out.push_str(&" ".repeat(ITEM_INDENT));
    out.push_str("- key: ");
    out.push_str(&format_scalar(&item.key));
    out.push('\n');

    push_field(out, "section", &item.section);
    push_field(out, "name_zh", &item.name);

    if item.description.contains('\n') {
        out.push_str(&" ".repeat(FIELD_INDENT));
        out.push_str("description_zh: |\n");
        for line in item.description.split('\n') {
            let line = line.trim_end_matches(char::is_control);
            if !line.is_empty() {
                out.push_str(&" ".repeat(BLOCK_INDENT));
                out.push_str(line);
            }
            out.push('\n');
        }
    } else {
        push_field(out, "description_zh", &item.description);
    }
}

/// Serializes every version in order, items sorted by key, empty optional
/// fields omitted
pub fn serialize_metadata(store: &VersionedMetadataStore) -> String {
    if store.is_empty() {
        return "versions: {}\n".to_string();
    }

    let mut out = String::from("versions:\n");
    for version in store.versions() {
        out.push_str(&" ".repeat(VERSION_INDENT));
        out.push_str(&format_scalar(version.name()));
        out.push_str(":\n");

        out.push_str(&" ".repeat(ITEMS_INDENT));
        if version.is_empty() {
            out.push_str("items: []\n");
            continue;
        }
        out.push_str("items:\n");
        for item in version.items() {
            push_item(&mut out, item);
        }
    }
    out
}

/// Block-format file backing
#[derive(Debug, Clone, Copy, Default)]
pub struct TextBacking;

impl MetadataBacking for TextBacking {
    fn kind(&self) -> BackingKind {
        BackingKind::Text
    }

    fn load(&self, path: &Path) -> StoreResult<VersionedMetadataStore> {
        let text = read_text(path)?;
        let parsed = parse_metadata(&text);
        for warning in &parsed.warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        tracing::debug!(
            path = %path.display(),
            versions = parsed.store.versions().len(),
            items = parsed.store.total_items(),
            "loaded metadata"
        );
        Ok(parsed.store)
    }

    fn save(&self, store: &VersionedMetadataStore, path: &Path) -> StoreResult<()> {
        write_atomic(path, serialize_metadata(store).as_bytes())?;
        tracing::debug!(path = %path.display(), items = store.total_items(), "saved metadata");
        Ok(())
    }
}
