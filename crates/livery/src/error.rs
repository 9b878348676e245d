//! Error types for the theme lifecycle.

use std::error::Error as StdError;
use std::fmt;

/// Category of a [`ThemeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeErrorKind {
    /// Unknown theme name, or no valid theme found at all.
    NotFound,
    /// A theme directory failed structural or content validation.
    Invalid,
    /// The loader failed, or produced an empty render set.
    LoadFailed,
    /// A switch failed and was rolled back.
    SwitchFailed,
    /// Malformed metadata file.
    ConfigInvalid,
}

impl fmt::Display for ThemeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThemeErrorKind::NotFound => "ThemeNotFound",
            ThemeErrorKind::Invalid => "ThemeInvalid",
            ThemeErrorKind::LoadFailed => "ThemeLoadFailed",
            ThemeErrorKind::SwitchFailed => "ThemeSwitchFailed",
            ThemeErrorKind::ConfigInvalid => "ThemeConfigInvalid",
        };
        f.write_str(name)
    }
}

/// Error raised by discovery, the registry and the engine.
///
/// Every error names the offending theme (empty when the failure is not about a
/// particular theme) and carries a human-readable message. The underlying
/// cause, if any, is available through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[error("theme error [{theme}]: {message}")]
pub struct ThemeError {
    kind: ThemeErrorKind,
    theme: String,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

/// Result alias for theme operations.
pub type ThemeResult<T> = Result<T, ThemeError>;

impl ThemeError {
    pub fn new(kind: ThemeErrorKind, theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            theme: theme.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ThemeErrorKind::NotFound, theme, message)
    }

    pub fn invalid(theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ThemeErrorKind::Invalid, theme, message)
    }

    pub fn load_failed(theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ThemeErrorKind::LoadFailed, theme, message)
    }

    pub fn switch_failed(theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ThemeErrorKind::SwitchFailed, theme, message)
    }

    pub fn config_invalid(theme: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ThemeErrorKind::ConfigInvalid, theme, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ThemeErrorKind {
        self.kind
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ThemeErrorKind::NotFound
    }

    /// The wrapped cause as a [`ThemeError`], when it is one.
    pub fn theme_cause(&self) -> Option<&ThemeError> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<ThemeError>())
    }
}
