//! In-memory configuration document
//!
//! A [`ConfigDocument`] is the ordered list of [`LineRecord`]s of one file
//! plus an index of [`ConfigEntry`]s, one per key-value line. Rows of the
//! entry index are stable for the lifetime of a load: lines never reorder
//! and entries are only rebuilt by parsing a new text.

use serde::Serialize;

use super::line::{LineEnding, LineRecord};

const BOM: char = '\u{feff}';

/// One addressable key, backed by exactly one key-value line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    /// Section derived from the nearest ALL-CAPS comment above, empty if none
    pub section: String,
    /// Current value, including an unsaved edit
    pub value: String,
    /// Index of the owning line in [`ConfigDocument::lines`]
    pub line_index: usize,
}

/// A parsed configuration file that can reproduce its source byte-for-byte
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    lines: Vec<LineRecord>,
    entries: Vec<ConfigEntry>,
    bom: bool,
}

impl ConfigDocument {
    /// Parses a whole file in one pass. Never fails: unrecognized lines are
    /// kept verbatim as [`LineKind::Other`](super::LineKind::Other).
    pub fn parse(text: &str) -> Self {
        let (bom, text) = match text.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let mut lines = Vec::new();
        let mut entries = Vec::new();
        let mut section = String::new();

        for piece in text.split_inclusive('\n') {
            let (raw, ending) = if let Some(body) = piece.strip_suffix("\r\n") {
                (body, LineEnding::CrLf)
            } else if let Some(body) = piece.strip_suffix('\n') {
                (body, LineEnding::Lf)
            } else {
                (piece, LineEnding::None)
            };

            let line = LineRecord::parse(raw, ending, &mut section);
            if let Some(kv) = line.key_value() {
                entries.push(ConfigEntry {
                    key: kv.key.clone(),
                    section: kv.section.clone(),
                    value: kv.value.clone(),
                    line_index: lines.len(),
                });
            }
            lines.push(line);
        }

        Self {
            lines,
            entries,
            bom,
        }
    }

    /// Renders the document. Untouched lines come out exactly as read.
    pub fn render(&self) -> String {
        let capacity = self.lines.iter().map(|l| l.raw().len() + 2).sum::<usize>() + 3;
        let mut out = String::with_capacity(capacity);
        if self.bom {
            out.push(BOM);
        }
        for line in &self.lines {
            out.push_str(&line.render());
            out.push_str(line.ending().as_str());
        }
        out
    }

    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    /// Entry at a row position
    pub fn entry(&self, row: usize) -> Option<&ConfigEntry> {
        self.entries.get(row)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row of the entry for `key`. When a key occurs more than once the last
    /// occurrence wins, as a flat key-value reader would interpret the file.
    pub fn find_row(&self, key: &str) -> Option<usize> {
        self.entries.iter().rposition(|e| e.key == key)
    }

    /// Entry for `key`, last occurrence wins
    pub fn find(&self, key: &str) -> Option<&ConfigEntry> {
        self.find_row(key).map(|row| &self.entries[row])
    }

    /// All rows carrying `key`, in file order
    pub fn rows_for_key(&self, key: &str) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.key == key)
            .map(|(row, _)| row)
            .collect()
    }

    /// Edits the value of the entry at `row`.
    ///
    /// The owning line is marked dirty only if the value differs from what
    /// the file holds. Values containing line breaks are rejected because
    /// they would split the line, as are values that would parse back as
    /// something else. Returns whether the entry value changed.
    pub fn set_value(&mut self, row: usize, value: &str) -> bool {
        let Some(entry) = self.entries.get_mut(row) else {
            return false;
        };
        if value.contains(['\n', '\r']) {
            tracing::warn!(key = %entry.key, "rejected value containing a line break");
            return false;
        }
        if entry.value == value {
            return false;
        }

        let Some(line) = self.lines.get_mut(entry.line_index) else {
            return false;
        };
        if !line.accepts_value(value) {
            tracing::warn!(key = %entry.key, "rejected value that would not read back unchanged");
            return false;
        }
        line.set_pending(value);
        entry.value = value.to_string();
        true
    }

    /// True when any line has an unsaved override
    pub fn is_dirty(&self) -> bool {
        self.lines.iter().any(LineRecord::is_dirty)
    }

    /// Number of lines with unsaved overrides
    pub fn dirty_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_dirty()).count()
    }

    /// Marks the current rendering as the new original after a save
    pub fn commit(&mut self) {
        for line in &mut self.lines {
            line.commit();
        }
    }
}
