//! Failures below the theme lifecycle.
//!
//! [`RenderError`] covers walking a theme tree, compiling it into a render
//! set and executing a render key. MiniJinja's error kinds are folded into
//! these variants so callers never match on the template engine's types.

use std::fmt;

/// Why a theme could not be compiled or a render key could not be executed.
#[derive(Debug)]
pub enum RenderError {
    /// A template failed to parse, or referenced an unknown filter, test,
    /// function or method.
    TemplateError(String),

    /// Render key not present in the active render set.
    TemplateNotFound(String),

    /// Render data could not be serialized for the template engine.
    SerializationError(String),

    /// Reading a template from the theme source failed.
    IoError(std::io::Error),

    /// A compiled template failed while rendering: a bad operation or
    /// argument, or a failed write to the output.
    ExecutionError(String),

    /// Render data could not be turned into a template context.
    ContextError(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TemplateError(msg) => write!(f, "template error: {}", msg),
            RenderError::TemplateNotFound(name) => write!(f, "template not found: {}", name),
            RenderError::SerializationError(msg) => write!(f, "serialization error: {}", msg),
            RenderError::IoError(err) => write!(f, "I/O error: {}", err),
            RenderError::ExecutionError(msg) => write!(f, "render failed: {}", msg),
            RenderError::ContextError(msg) => write!(f, "context error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::IoError(err)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::SerializationError(err.to_string())
    }
}

// Keeps minijinja's error kinds out of the public API
impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(err.to_string()),
            ErrorKind::SyntaxError
            | ErrorKind::BadEscape
            | ErrorKind::UndefinedError
            | ErrorKind::UnknownTest
            | ErrorKind::UnknownFunction
            | ErrorKind::UnknownFilter
            | ErrorKind::UnknownMethod => RenderError::TemplateError(err.to_string()),
            ErrorKind::BadSerialization => RenderError::SerializationError(err.to_string()),
            // InvalidOperation, argument errors, WriteFailure and kinds added
            // by later minijinja releases
            _ => RenderError::ExecutionError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderError::TemplateNotFound("singles/about.tmpl".to_string());
        assert!(err.to_string().contains("template not found"));
        assert!(err.to_string().contains("singles/about.tmpl"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let render_err: RenderError = io_err.into();
        assert!(matches!(render_err, RenderError::IoError(_)));
        assert!(std::error::Error::source(&render_err).is_some());
    }

    #[test]
    fn test_from_minijinja_syntax_error() {
        let mj_err = minijinja::Error::new(minijinja::ErrorKind::SyntaxError, "unexpected end");
        let render_err: RenderError = mj_err.into();
        assert!(matches!(render_err, RenderError::TemplateError(_)));
    }

    #[test]
    fn test_from_minijinja_template_not_found() {
        let mj_err = minijinja::Error::new(
            minijinja::ErrorKind::TemplateNotFound,
            "template 'layouts/base.tmpl' not found",
        );
        let render_err: RenderError = mj_err.into();
        assert!(matches!(render_err, RenderError::TemplateNotFound(_)));
    }

    #[test]
    fn test_from_minijinja_runtime_failures() {
        for kind in [
            minijinja::ErrorKind::InvalidOperation,
            minijinja::ErrorKind::MissingArgument,
            minijinja::ErrorKind::WriteFailure,
        ] {
            let render_err: RenderError = minijinja::Error::new(kind, "boom").into();
            assert!(matches!(render_err, RenderError::ExecutionError(_)));
            assert!(render_err.to_string().starts_with("render failed"));
        }
    }
}
