//! Line records for layout-preserving configuration editing
//!
//! Every physical line keeps its exact original text. Key-value lines also
//! keep byte offsets that split the raw text into four spans:
//!
//! ```text
//!   host = "example.com"   # primary
//!   |------||----------||--------------|
//!    prefix    value       suffix
//! ```
//!
//! (`trailing` sits between value and suffix and holds whitespace that
//! followed an unquoted value.) An edit never touches the raw text; it only
//! sets an override that replaces the value span when the line is rendered.

use std::borrow::Cow;

use super::section::section_header;

/// Line terminator as it appeared in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    /// Final line without a terminator
    None,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::None => "",
        }
    }
}

/// Byte offsets into the raw line of a key-value statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyValueSpans {
    /// First byte of the value (after `=`, leading spaces and an opening quote)
    pub value_start: usize,
    /// One past the last byte of the value
    pub value_end: usize,
    /// First byte of the suffix (closing quote, inline comment, or end of line)
    pub suffix_start: usize,
}

/// A parsed `KEY=VALUE` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    /// Value as it appears in the file (quotes removed when the whole value is quoted)
    pub value: String,
    /// Nearest preceding section header, empty when none
    pub section: String,
    pub spans: KeyValueSpans,
}

/// Classification of a physical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Comment {
        /// Set when the comment matched the section-header heuristic
        section: Option<String>,
    },
    KeyValue(KeyValue),
    Other,
}

/// One physical line of a configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    raw: String,
    ending: LineEnding,
    kind: LineKind,
    pending: Option<String>,
}

impl LineRecord {
    /// Classifies a raw line (terminator already removed).
    ///
    /// `current_section` is updated when the line is a section header and is
    /// attached to key-value lines.
    pub fn parse(raw: &str, ending: LineEnding, current_section: &mut String) -> Self {
        let trimmed = raw.trim();

        let kind = if trimmed.is_empty() {
            LineKind::Blank
        } else if trimmed.starts_with(['#', ';']) {
            let section = section_header(raw).map(str::to_string);
            if let Some(name) = &section {
                current_section.clone_from(name);
            }
            LineKind::Comment { section }
        } else if let Some((key, value, spans)) = parse_key_value(raw) {
            LineKind::KeyValue(KeyValue {
                key,
                value,
                section: current_section.clone(),
                spans,
            })
        } else {
            LineKind::Other
        };

        Self {
            raw: raw.to_string(),
            ending,
            kind,
            pending: None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn ending(&self) -> LineEnding {
        self.ending
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    pub fn key_value(&self) -> Option<&KeyValue> {
        match &self.kind {
            LineKind::KeyValue(kv) => Some(kv),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self.kind, LineKind::Blank)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, LineKind::Comment { .. })
    }

    /// True when an override is waiting to be written
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// The value an editor should show: the override if set, else the parsed value
    pub fn current_value(&self) -> Option<&str> {
        let kv = self.key_value()?;
        Some(self.pending.as_deref().unwrap_or(&kv.value))
    }

    /// Text before the value, including `=`, skipped spaces and any opening quote
    pub fn prefix(&self) -> Option<&str> {
        self.key_value().map(|kv| &self.raw[..kv.spans.value_start])
    }

    /// Original value text exactly as written
    pub fn value_text(&self) -> Option<&str> {
        self.key_value()
            .map(|kv| &self.raw[kv.spans.value_start..kv.spans.value_end])
    }

    /// Whitespace between an unquoted value and the suffix
    pub fn trailing_space(&self) -> Option<&str> {
        self.key_value()
            .map(|kv| &self.raw[kv.spans.value_end..kv.spans.suffix_start])
    }

    /// Closing quote and/or inline comment through end of line
    pub fn suffix(&self) -> Option<&str> {
        self.key_value().map(|kv| &self.raw[kv.spans.suffix_start..])
    }

    /// True when writing `value` into this line reads back as the same key
    /// and value. Fails for values that would open an inline comment, lose
    /// surrounding spaces, or break the enclosing quotes.
    pub fn accepts_value(&self, value: &str) -> bool {
        let Some(kv) = self.key_value() else {
            return false;
        };
        if value.contains(['\n', '\r']) {
            return false;
        }

        let candidate = splice(&self.raw, kv.spans, value);
        let mut scratch = String::new();
        LineRecord::parse(&candidate, self.ending, &mut scratch)
            .key_value()
            .is_some_and(|reparsed| reparsed.key == kv.key && reparsed.value == value)
    }

    /// Sets or clears the override. Returns whether the line is dirty afterwards.
    ///
    /// Setting the original value clears the override. Non key-value lines
    /// are never dirtied.
    pub fn set_pending(&mut self, value: &str) -> bool {
        let Some(kv) = self.key_value() else {
            return false;
        };

        if kv.value == value {
            self.pending = None;
        } else {
            self.pending = Some(value.to_string());
        }
        self.is_dirty()
    }

    /// Renders the line without its terminator
    pub fn render(&self) -> Cow<'_, str> {
        match (&self.kind, &self.pending) {
            (LineKind::KeyValue(kv), Some(new_value)) => Cow::Owned(splice(&self.raw, kv.spans, new_value)),
            _ => Cow::Borrowed(&self.raw),
        }
    }

    /// Folds the override into the raw text after a successful save
    pub fn commit(&mut self) {
        let Some(new_value) = self.pending.take() else {
            return;
        };
        let rendered = {
            let LineKind::KeyValue(kv) = &self.kind else {
                return;
            };
            splice(&self.raw, kv.spans, &new_value)
        };

        if let LineKind::KeyValue(kv) = &mut self.kind {
            let shift_from = kv.spans.value_end;
            let new_end = kv.spans.value_start + new_value.len();
            kv.spans.suffix_start = new_end + (kv.spans.suffix_start - shift_from);
            kv.spans.value_end = new_end;
            kv.value = new_value;
        }
        self.raw = rendered;
    }
}

/// `raw` with the value span replaced by `value`
fn splice(raw: &str, spans: KeyValueSpans, value: &str) -> String {
    let mut out = String::with_capacity(raw.len() + value.len());
    out.push_str(&raw[..spans.value_start]);
    out.push_str(value);
    out.push_str(&raw[spans.value_end..]);
    out
}

/// True when the byte at `pos` is preceded by an odd run of backslashes
fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let run = bytes[..pos].iter().rev().take_while(|b| **b == b'\\').count();
    run % 2 == 1
}

/// Returns the inner range when `text[start..end]` is exactly one
/// double-quoted string
fn quoted_inner(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    if end < start + 2 || bytes[start] != b'"' || bytes[end - 1] != b'"' {
        return None;
    }
    if is_escaped(bytes, end - 1) {
        return None;
    }
    let inner_unescaped_quote = (start + 1..end - 1).any(|i| bytes[i] == b'"' && !is_escaped(bytes, i));
    if inner_unescaped_quote {
        return None;
    }
    Some((start + 1, end - 1))
}

/// Parses `KEY = VALUE  # comment`, returning key, value and spans.
///
/// Returns `None` when there is no `=` or the key is empty.
fn parse_key_value(line: &str) -> Option<(String, String, KeyValueSpans)> {
    let eq = line.find('=')?;
    let key = line[..eq].trim();
    if key.is_empty() {
        return None;
    }

    let after_eq = &line[eq + 1..];
    let value_start = eq + 1 + (after_eq.len() - after_eq.trim_start().len());

    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut comment_at = None;
    for (offset, ch) in line[value_start..].char_indices() {
        let pos = value_start + offset;
        if ch == '"' && !is_escaped(bytes, pos) {
            in_quotes = !in_quotes;
        }
        if ch == '#' && !in_quotes {
            comment_at = Some(pos);
            break;
        }
    }

    let region_end = comment_at.unwrap_or(line.len());
    let trimmed_end = value_start + line[value_start..region_end].trim_end().len();

    let spans = match quoted_inner(line, value_start, trimmed_end) {
        Some((inner_start, inner_end)) => KeyValueSpans {
            value_start: inner_start,
            value_end: inner_end,
            suffix_start: inner_end,
        },
        None => KeyValueSpans {
            value_start,
            value_end: trimmed_end,
            suffix_start: region_end,
        },
    };

    let value = line[spans.value_start..spans.value_end].to_string();
    Some((key.to_string(), value, spans))
}
