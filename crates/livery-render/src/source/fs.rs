use std::io;
use std::path::{Path, PathBuf};

use super::{EntryKind, SourceEntry, ThemeSource};

/// Theme source backed by the local filesystem.
///
/// Symlinks are followed. Entries that are neither files nor directories
/// (sockets, fifos) are left out of listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl FsSource {
    pub fn new() -> Self {
        FsSource
    }
}

impl ThemeSource for FsSource {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let entry_path = entry.path();

            if entry_path.is_dir() {
                entries.push(SourceEntry::dir(name));
            } else if entry_path.is_file() {
                entries.push(SourceEntry::file(name));
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = std::fs::metadata(path)?;
        if meta.is_dir() {
            Ok(EntryKind::Dir)
        } else {
            Ok(EntryKind::File)
        }
    }

    fn watch_path(&self, path: &Path) -> Option<PathBuf> {
        path.canonicalize().ok().filter(|p| p.is_dir())
    }

    fn is_embedded(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_dir_sorted_with_kinds() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("pages")).unwrap();
        fs::write(temp.path().join("b.tmpl"), "b").unwrap();
        fs::write(temp.path().join("a.tmpl"), "a").unwrap();

        let entries = FsSource.list_dir(temp.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                SourceEntry::file("a.tmpl"),
                SourceEntry::file("b.tmpl"),
                SourceEntry::dir("pages"),
            ]
        );
    }

    #[test]
    fn test_stat_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = FsSource.stat(&temp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_watch_path_canonicalizes_directories() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file.tmpl"), "x").unwrap();

        let watched = FsSource.watch_path(temp.path()).unwrap();
        assert_eq!(watched, temp.path().canonicalize().unwrap());
        assert!(FsSource.watch_path(&temp.path().join("file.tmpl")).is_none());
        assert!(!FsSource.is_embedded());
    }
}
