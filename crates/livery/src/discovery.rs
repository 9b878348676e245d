//! Theme discovery: mode detection, validation and metadata loading.
//!
//! A template root is laid out in one of two ways:
//!
//! ```text
//! Legacy                      Multi-theme
//! templates/                  templates/
//! ├── layouts/                ├── default/
//! ├── pages/                  │   ├── layouts/  pages/  singles/  errors/
//! ├── singles/                │   └── theme.json
//! ├── errors/                 └── dark/
//! └── partials/               └── layouts/  pages/  singles/  errors/
//! ```
//!
//! Multi-theme mode wins as soon as one child directory is a valid theme on its
//! own, even if the root also looks like a legacy tree. Everything else is
//! legacy.
//!
//! Discovery works through a [`ThemeSource`], so the same rules apply to the
//! filesystem and to embedded archives.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use livery_render::{is_template_file, EntryKind, ThemeSource};

use crate::error::{ThemeError, ThemeResult};
use crate::metadata::{validate_metadata, ThemeMetadata, METADATA_FILE};
use crate::theme::LEGACY_THEME_NAME;

/// Directories every theme must have.
pub const REQUIRED_DIRS: [&str; 4] = ["layouts", "pages", "singles", "errors"];

/// Optional directory for shared fragments.
pub const PARTIALS_DIR: &str = "partials";

/// How a template root is organised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum DiscoveryMode {
    /// The root is the only theme.
    Legacy,
    /// Each valid child directory is a theme.
    MultiTheme,
}

/// Classifies and validates theme directories under one root.
#[derive(Debug, Clone)]
pub struct ThemeDiscovery {
    source: Arc<dyn ThemeSource>,
    root: PathBuf,
}

impl ThemeDiscovery {
    pub fn new(source: Arc<dyn ThemeSource>, root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            root: root.into(),
        }
    }

    pub fn source(&self) -> &Arc<dyn ThemeSource> {
        &self.source
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decides between legacy and multi-theme mode.
    ///
    /// Fails only when the root itself cannot be listed.
    pub fn detect_mode(&self) -> ThemeResult<DiscoveryMode> {
        let candidates = self.candidates()?;
        if candidates.iter().any(|path| self.validate_theme(path).is_ok()) {
            return Ok(DiscoveryMode::MultiTheme);
        }

        if !self.has_legacy_layout() {
            tracing::debug!(
                root = %self.root.display(),
                "no theme directories and no legacy layout, assuming legacy"
            );
        }
        Ok(DiscoveryMode::Legacy)
    }

    /// True if the root directly holds every required directory, each non-empty.
    pub fn has_legacy_layout(&self) -> bool {
        REQUIRED_DIRS.iter().all(|dir| {
            self.source
                .list_dir(&self.root.join(dir))
                .map(|entries| !entries.is_empty())
                .unwrap_or(false)
        })
    }

    /// Child directories of the root, sorted by name.
    pub fn candidates(&self) -> ThemeResult<Vec<PathBuf>> {
        let entries = self.source.list_dir(&self.root).map_err(|err| {
            ThemeError::not_found(
                "",
                format!("cannot read template directory {}", self.root.display()),
            )
            .with_source(err)
        })?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_dir())
            .map(|entry| self.root.join(entry.name))
            .collect())
    }

    /// Runs the structure, content and metadata checks, stopping at the first
    /// failure.
    pub fn validate_theme(&self, path: &Path) -> ThemeResult<()> {
        let name = theme_name(path);
        self.validate_structure(&name, path)?;
        self.validate_content(&name, path)?;
        self.validate_config(&name, path)
    }

    fn validate_structure(&self, name: &str, path: &Path) -> ThemeResult<()> {
        for dir in REQUIRED_DIRS {
            if !self.source.is_dir(&path.join(dir)) {
                return Err(ThemeError::invalid(
                    name,
                    format!("invalid theme structure: required directory '{}' not found", dir),
                ));
            }
        }

        if !self.source.is_dir(&path.join(PARTIALS_DIR)) {
            tracing::debug!(theme = name, "theme has no partials directory");
        }
        Ok(())
    }

    fn validate_content(&self, name: &str, path: &Path) -> ThemeResult<()> {
        for dir in ["layouts", "singles", "errors"] {
            if !self.has_templates(&path.join(dir)).map_err(|err| unreadable(name, dir, err))? {
                return Err(ThemeError::invalid(
                    name,
                    format!("missing required templates: {} directory has no template files", dir),
                ));
            }
        }

        if !self.has_page_templates(&path.join("pages")).map_err(|err| unreadable(name, "pages", err))? {
            return Err(ThemeError::invalid(
                name,
                "missing required templates: pages directory has no template files \
                 (directly or one level down)",
            ));
        }
        Ok(())
    }

    fn validate_config(&self, name: &str, path: &Path) -> ThemeResult<()> {
        match self.read_metadata_file(path) {
            Ok(Some(text)) => validate_metadata(name, &text),
            Ok(None) => Ok(()),
            Err(err) => Err(ThemeError::config_invalid(
                name,
                format!("cannot read {}", METADATA_FILE),
            )
            .with_source(err)),
        }
    }

    fn has_templates(&self, dir: &Path) -> io::Result<bool> {
        Ok(self
            .source
            .list_dir(dir)?
            .iter()
            .any(|entry| entry.is_file() && is_template_file(&entry.name)))
    }

    fn has_page_templates(&self, pages: &Path) -> io::Result<bool> {
        if self.has_templates(pages)? {
            return Ok(true);
        }
        for entry in self.source.list_dir(pages)? {
            if entry.is_dir() && self.has_templates(&pages.join(&entry.name)).unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Loads the theme's metadata, or defaults when it has no metadata file.
    pub fn load_metadata(&self, path: &Path) -> ThemeResult<ThemeMetadata> {
        let name = theme_name(path);
        match self.read_metadata_file(path) {
            Ok(Some(text)) => ThemeMetadata::parse(&name, &text),
            Ok(None) => Ok(ThemeMetadata::defaults_for(&name)),
            Err(err) => Err(ThemeError::config_invalid(
                name,
                format!("cannot read {}", METADATA_FILE),
            )
            .with_source(err)),
        }
    }

    fn read_metadata_file(&self, path: &Path) -> io::Result<Option<String>> {
        let file = path.join(METADATA_FILE);
        match self.source.stat(&file) {
            Ok(EntryKind::File) => self.source.read_file(&file).map(Some),
            Ok(EntryKind::Dir) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", file.display()),
            )),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Theme name for a directory: its base name.
pub fn theme_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| LEGACY_THEME_NAME.to_string())
}

fn unreadable(theme: &str, dir: &str, err: io::Error) -> ThemeError {
    ThemeError::invalid(theme, format!("cannot read {} directory", dir)).with_source(err)
}
