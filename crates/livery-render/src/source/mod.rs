//! Storage capability for theme trees.
//!
//! Discovery, validation and loading never touch `std::fs` directly. They go
//! through a [`ThemeSource`], which exposes the three operations a theme tree
//! needs (list a directory, read a file, stat a path) plus a single capability
//! probe, [`ThemeSource::watch_path`], that tells the caller whether the tree
//! can be monitored for changes.
//!
//! Two backends are provided:
//!
//! - [`FsSource`]: the local filesystem. Paths are real paths.
//! - [`EmbeddedSource`]: a read-only archive compiled into the binary. Paths are
//!   archive-relative with `/` separators, and `""` or `"."` is the root.
//!
//! ```rust
//! use livery_render::source::{EmbeddedSource, EntryKind, ThemeSource};
//! use std::path::Path;
//!
//! static FILES: &[(&str, &str)] = &[
//!     ("default/layouts/layout.tmpl", "{% block content %}{% endblock %}"),
//!     ("default/errors/404.tmpl", "missing"),
//! ];
//!
//! let source = EmbeddedSource::new(FILES);
//! assert_eq!(source.stat(Path::new("default/layouts")).unwrap(), EntryKind::Dir);
//! assert!(source.watch_path(Path::new("default")).is_none());
//! ```

mod embedded;
mod fs;

pub use embedded::EmbeddedSource;
pub use fs::FsSource;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Template file extensions recognized by validation, loading and watch gating.
///
/// Matching is case-sensitive and on the full suffix, so `nav.html.bak` is not
/// a template.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".tmpl", ".html", ".tpl", ".jinja", ".jinja2", ".j2"];

/// Returns true if `name` ends with one of [`TEMPLATE_EXTENSIONS`].
pub fn is_template_file(name: &str) -> bool {
    TEMPLATE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Dir,
}

/// A single entry returned by [`ThemeSource::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Base name of the entry (no directory components).
    pub name: String,
    pub kind: EntryKind,
}

impl SourceEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Uniform read access to a theme tree.
///
/// Implementations must be cheap to share across threads; the registry holds
/// one behind an `Arc` for its whole lifetime.
pub trait ThemeSource: Send + Sync + fmt::Debug {
    /// Lists the entries of a directory, sorted by name.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<SourceEntry>>;

    /// Reads a file as UTF-8 text.
    fn read_file(&self, path: &Path) -> io::Result<String>;

    /// Returns the kind of the entry at `path`, or `NotFound` when absent.
    fn stat(&self, path: &Path) -> io::Result<EntryKind>;

    /// Returns a real directory that can be handed to a filesystem watcher, or
    /// `None` if this backend cannot be watched.
    fn watch_path(&self, path: &Path) -> Option<PathBuf>;

    /// True for archive backends.
    fn is_embedded(&self) -> bool;

    /// Convenience: true if `path` exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.stat(path), Ok(EntryKind::Dir))
    }

    /// Convenience: true if `path` exists and is a file.
    fn is_file(&self, path: &Path) -> bool {
        matches!(self.stat(path), Ok(EntryKind::File))
    }
}

/// A template file found while walking a theme tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Path relative to the walk root, always `/`-separated
    /// (e.g., `"pages/home/index.tmpl"`).
    pub relative: String,
    /// Full path as understood by the source.
    pub path: PathBuf,
}

/// Recursively collects every template file under `root`, in sorted order.
///
/// Non-template files are skipped. Entries are visited in the order
/// [`ThemeSource::list_dir`] returns them, so the result is deterministic.
pub fn walk_templates(source: &dyn ThemeSource, root: &Path) -> io::Result<Vec<TemplateFile>> {
    let mut files = Vec::new();
    walk_templates_recursive(source, root, "", &mut files)?;
    Ok(files)
}

fn walk_templates_recursive(
    source: &dyn ThemeSource,
    current: &Path,
    prefix: &str,
    files: &mut Vec<TemplateFile>,
) -> io::Result<()> {
    for entry in source.list_dir(current)? {
        let path = current.join(&entry.name);
        let relative = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{}/{}", prefix, entry.name)
        };

        match entry.kind {
            EntryKind::Dir => walk_templates_recursive(source, &path, &relative, files)?,
            EntryKind::File if is_template_file(&entry.name) => {
                files.push(TemplateFile { relative, path });
            }
            EntryKind::File => {}
        }
    }
    Ok(())
}
