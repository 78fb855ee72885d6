//! Section-header heuristic
//!
//! Configuration files carry no formal section syntax. By convention a
//! comment whose body is an ALL-CAPS label (`# NETWORK`, `; DISPLAY OPTIONS`)
//! starts a new section for the key-value lines below it.

/// Shortest body accepted as a section label (in characters)
pub const MIN_SECTION_LEN: usize = 3;

/// Longest body accepted as a section label (in characters)
pub const MAX_SECTION_LEN: usize = 80;

/// Returns the comment body with one leading comment marker and surrounding
/// whitespace removed. `## AUDIO` has the body `# AUDIO`.
pub fn comment_body(line: &str) -> &str {
    let trimmed = line.trim();
    trimmed.strip_prefix(['#', ';']).unwrap_or(trimmed).trim()
}

/// Tests a raw comment line against the section-header heuristic.
///
/// Returns the section name when the comment body is non-empty, contains no
/// `:`, is between [`MIN_SECTION_LEN`] and [`MAX_SECTION_LEN`] characters,
/// has at least one letter, and no letter is lowercase. Letters without case
/// (CJK, for example) count as uppercase.
pub fn section_header(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with(['#', ';']) {
        return None;
    }

    let body = comment_body(trimmed);
    if body.is_empty() || body.contains(':') {
        return None;
    }

    let len = body.chars().count();
    if !(MIN_SECTION_LEN..=MAX_SECTION_LEN).contains(&len) {
        return None;
    }

    let mut has_letter = false;
    for ch in body.chars().filter(|c| c.is_alphabetic()) {
        has_letter = true;
        if ch.is_lowercase() {
            return None;
        }
    }

    has_letter.then_some(body)
}
