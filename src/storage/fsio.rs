//! Whole-file reads and atomic writes

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{StoreError, StoreResult};

/// Reads a UTF-8 text file
pub(crate) fn read_text(path: &Path) -> StoreResult<String> {
    let bytes = fs::read(path).map_err(|e| StoreError::io("read", path, e))?;
    String::from_utf8(bytes).map_err(|_| StoreError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}

/// Sibling path used while writing `path`
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("confedit"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `contents` to a temp file next to `path`, then renames it over `path`
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io("create directory", parent, e))?;
    }

    let temp = temp_path(path);
    if let Err(e) = fs::write(&temp, contents) {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::io("write", &temp, e));
    }

    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(StoreError::io("write", path, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("a.conf");

        write_atomic(&path, b"k=v\n").unwrap();
        assert_eq!(read_text(&path).unwrap(), "k=v\n");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_text(&dir.path().join("nope.conf")).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.path().unwrap().ends_with("nope.conf"));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.conf");
        fs::write(&path, [0x6b, 0x3d, 0xff, 0xfe]).unwrap();

        assert!(matches!(read_text(&path), Err(StoreError::InvalidUtf8 { .. })));
    }

    #[test]
    fn writing_over_a_directory_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("taken");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), "x").unwrap();

        let err = write_atomic(&target, b"data").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(!temp_path(&target).exists());
    }
}
