//! Render-key naming convention.
//!
//! Loaders register templates under keys built here and the engine resolves
//! logical page/single/error requests with the same functions, so the two
//! sides can never drift apart.
//!
//! | Request | Key |
//! |---------|-----|
//! | page `home` with layout `layout.tmpl` | `layout.tmpl:pages/home` |
//! | single `about` | `singles/about.tmpl` |
//! | error `404` | `error/404.tmpl` |

/// Prefix of page keys after the layout separator.
pub const PAGES_PREFIX: &str = "pages/";
/// Prefix of single keys.
pub const SINGLES_PREFIX: &str = "singles/";
/// Prefix of error keys.
pub const ERROR_PREFIX: &str = "error/";

/// `<layout>:pages/<name>`
pub fn page_key(layout: &str, name: &str) -> String {
    format!("{}:{}{}", layout, PAGES_PREFIX, name)
}

/// `singles/<name>.<suffix>`
pub fn single_key(name: &str, suffix: &str) -> String {
    format!("{}{}.{}", SINGLES_PREFIX, name, suffix)
}

/// `error/<name>.<suffix>`
pub fn error_key(name: &str, suffix: &str) -> String {
    format!("{}{}.{}", ERROR_PREFIX, name, suffix)
}

/// Candidate keys for an error page in multi-theme mode, most specific first.
///
/// Themes may ship a dedicated `error.<suffix>` or `single.<suffix>` wrapper
/// layout for error pages. The plain [`error_key`] is always the last resort.
pub fn error_candidates(name: &str, suffix: &str) -> [String; 3] {
    [
        format!("error.{}:{}{}", suffix, ERROR_PREFIX, name),
        format!("single.{}:{}{}", suffix, ERROR_PREFIX, name),
        error_key(name, suffix),
    ]
}

/// Category of a render key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateCategory {
    Page,
    Single,
    Error,
    Other,
}

impl TemplateCategory {
    /// Classifies a render key by its shape.
    pub fn of(key: &str) -> Self {
        let body = match key.split_once(':') {
            Some((_, rest)) => rest,
            None => key,
        };

        if body.starts_with(ERROR_PREFIX) {
            TemplateCategory::Error
        } else if key.contains(':') && body.starts_with(PAGES_PREFIX) {
            TemplateCategory::Page
        } else if body.starts_with(SINGLES_PREFIX) {
            TemplateCategory::Single
        } else {
            TemplateCategory::Other
        }
    }

    /// True for the categories a usable render set must offer at least one of.
    pub fn is_renderable(self) -> bool {
        !matches!(self, TemplateCategory::Other)
    }
}
