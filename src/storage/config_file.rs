//! Configuration file storage
//!
//! Loads a `KEY=VALUE` file into a [`ConfigDocument`] and writes it back.
//! Only lines with a pending edit are re-rendered; every other line is
//! written exactly as it was read.

use std::path::{Path, PathBuf};

use super::error::StoreResult;
use super::fsio::{read_text, write_atomic};
use crate::domain::ConfigDocument;

/// Store for one configuration file
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file
    pub fn load(&self) -> StoreResult<ConfigDocument> {
        let text = read_text(&self.path)?;
        let doc = ConfigDocument::parse(&text);

        tracing::debug!(
            path = %self.path.display(),
            lines = doc.lines().len(),
            entries = doc.len(),
            "loaded config"
        );
        Ok(doc)
    }

    /// Writes the document (atomic temp file + rename)
    pub fn save(&self, doc: &ConfigDocument) -> StoreResult<()> {
        write_atomic(&self.path, doc.render().as_bytes())?;

        tracing::debug!(
            path = %self.path.display(),
            edited_lines = doc.dirty_count(),
            "saved config"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreError;
    use std::fs;
    use tempfile::TempDir;

    const CONF: &str = "\
# GENERAL
name = \"My Server\"   # shown in lobby
max_players=16

; weird stuff survives
   indented_key   =   spaced value\t# tab before comment
[legacy-section]
path=\"C:\\#temp\"  # not a comment
# NETWORK
port=27015
";

    fn write_conf(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("server.conf");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn zero_edit_save_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, CONF);
        let store = ConfigStore::new(&path);

        let doc = store.load().unwrap();
        store.save(&doc).unwrap();

        assert_eq!(fs::read(&path).unwrap(), CONF.as_bytes());
    }

    #[test]
    fn crlf_file_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let text = CONF.replace('\n', "\r\n");
        let path = write_conf(&dir, &text);
        let store = ConfigStore::new(&path);

        let doc = store.load().unwrap();
        store.save(&doc).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn single_edit_touches_one_line() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, CONF);
        let store = ConfigStore::new(&path);

        let mut doc = store.load().unwrap();
        let row = doc.find_row("indented_key").unwrap();
        doc.set_value(row, "new");
        store.save(&doc).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        let changed: Vec<_> = CONF
            .lines()
            .zip(saved.lines())
            .filter(|(a, b)| a != b)
            .collect();
        assert_eq!(
            changed,
            vec![(
                "   indented_key   =   spaced value\t# tab before comment",
                "   indented_key   =   new\t# tab before comment"
            )]
        );
    }

    #[test]
    fn quoted_value_edit_keeps_quotes_and_comment() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, CONF);
        let store = ConfigStore::new(&path);

        let mut doc = store.load().unwrap();
        let row = doc.find_row("path").unwrap();
        assert_eq!(doc.entry(row).unwrap().value, "C:\\#temp");
        doc.set_value(row, "D:\\data");
        store.save(&doc).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("path=\"D:\\data\"  # not a comment\n"));
    }

    #[test]
    fn save_to_another_path() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, CONF);
        let doc = ConfigStore::new(&path).load().unwrap();

        let copy = ConfigStore::new(dir.path().join("copy").join("server.conf"));
        copy.save(&doc).unwrap();
        assert_eq!(fs::read_to_string(copy.path()).unwrap(), CONF);
    }

    #[test]
    fn missing_file_is_io_error_with_path() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("missing.conf"));

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.to_string().contains("missing.conf"));
    }

    #[test]
    fn unwritable_destination_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = write_conf(&dir, CONF);
        let doc = ConfigStore::new(&path).load().unwrap();

        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("child"), "x").unwrap();

        let err = ConfigStore::new(&blocked).save(&doc).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
