use std::path::PathBuf;

use serde::Serialize;

use crate::metadata::ThemeMetadata;

/// Name of the single theme registered in legacy mode.
pub const LEGACY_THEME_NAME: &str = "default";

/// A discovered, validated theme.
///
/// Entries are immutable once registered, apart from the default flag, which
/// moves when the registry's default theme changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theme {
    /// Unique key: the theme directory's base name, or `"default"` in legacy mode.
    pub name: String,
    /// Theme root as understood by the registry's source.
    pub root: PathBuf,
    pub is_default: bool,
    /// True when the theme lives in an embedded archive.
    pub is_embedded: bool,
    pub metadata: ThemeMetadata,
}
