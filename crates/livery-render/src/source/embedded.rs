use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use super::{EntryKind, SourceEntry, ThemeSource};

/// Read-only theme source over files compiled into the binary.
///
/// Built from `(path, content)` pairs, typically produced by the
/// `embed_themes!` macro. Directories are never listed explicitly; they are
/// inferred from the file paths. The archive root is addressed as `""` or `"."`.
#[derive(Debug, Clone)]
pub struct EmbeddedSource {
    files: BTreeMap<String, &'static str>,
    dirs: BTreeSet<String>,
}

impl EmbeddedSource {
    pub fn new(entries: &'static [(&'static str, &'static str)]) -> Self {
        let mut files = BTreeMap::new();
        let mut dirs = BTreeSet::new();
        dirs.insert(String::new());

        for (path, content) in entries {
            let key = normalize(Path::new(path));
            if key.is_empty() {
                continue;
            }
            let mut parent = key.as_str();
            while let Some(idx) = parent.rfind('/') {
                parent = &parent[..idx];
                dirs.insert(parent.to_string());
            }
            files.insert(key, *content);
        }

        Self { files, dirs }
    }

    /// Number of embedded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn children(&self, dir: &str) -> Vec<SourceEntry> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut entries: BTreeMap<&str, EntryKind> = BTreeMap::new();
        let candidates = self
            .dirs
            .iter()
            .map(|d| (d.as_str(), EntryKind::Dir))
            .chain(self.files.keys().map(|f| (f.as_str(), EntryKind::File)));

        for (path, kind) in candidates {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                if !rest.is_empty() && !rest.contains('/') {
                    entries.insert(rest, kind);
                }
            }
        }

        entries
            .into_iter()
            .map(|(name, kind)| SourceEntry {
                name: name.to_string(),
                kind,
            })
            .collect()
    }
}

/// Archive-relative key for `path`: `/`-joined normal components.
fn normalize(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }
    parts.join("/")
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found in embedded themes", path.display()),
    )
}

impl ThemeSource for EmbeddedSource {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<SourceEntry>> {
        let key = normalize(path);
        if !self.dirs.contains(&key) {
            return Err(not_found(path));
        }
        Ok(self.children(&key))
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize(path))
            .map(|content| content.to_string())
            .ok_or_else(|| not_found(path))
    }

    fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        let key = normalize(path);
        if self.dirs.contains(&key) {
            Ok(EntryKind::Dir)
        } else if self.files.contains_key(&key) {
            Ok(EntryKind::File)
        } else {
            Err(not_found(path))
        }
    }

    fn watch_path(&self, _path: &Path) -> Option<PathBuf> {
        None
    }

    fn is_embedded(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FILES: &[(&str, &str)] = &[
        ("default/layouts/layout.tmpl", "L"),
        ("default/pages/home/index.tmpl", "P"),
        ("default/theme.json", "{}"),
        ("dark/errors/404.tmpl", "E"),
    ];

    #[test]
    fn test_root_listing() {
        let source = EmbeddedSource::new(FILES);
        let root = source.list_dir(Path::new("")).unwrap();
        assert_eq!(root, vec![SourceEntry::dir("dark"), SourceEntry::dir("default")]);
        assert_eq!(source.list_dir(Path::new(".")).unwrap(), root);
    }

    #[test]
    fn test_nested_listing_mixes_files_and_dirs() {
        let source = EmbeddedSource::new(FILES);
        let entries = source.list_dir(Path::new("default")).unwrap();
        assert_eq!(
            entries,
            vec![
                SourceEntry::dir("layouts"),
                SourceEntry::dir("pages"),
                SourceEntry::file("theme.json"),
            ]
        );
    }

    #[test]
    fn test_stat_and_read() {
        let source = EmbeddedSource::new(FILES);
        assert_eq!(source.stat(Path::new("default/pages")).unwrap(), EntryKind::Dir);
        assert_eq!(
            source.stat(Path::new("./default/theme.json")).unwrap(),
            EntryKind::File
        );
        assert_eq!(
            source.read_file(Path::new("dark/errors/404.tmpl")).unwrap(),
            "E"
        );
        assert_eq!(
            source.stat(Path::new("ghost")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert!(source.list_dir(Path::new("default/theme.json")).is_err());
    }

    #[test]
    fn test_not_watchable() {
        let source = EmbeddedSource::new(FILES);
        assert!(source.is_embedded());
        assert!(source.watch_path(Path::new("default")).is_none());
        assert_eq!(source.len(), 4);
    }
}
