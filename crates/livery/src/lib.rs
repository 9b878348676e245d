//! # Livery - Runtime-Switchable Template Themes
//!
//! Livery manages the lifecycle of template themes for an application that
//! renders pages, standalone documents and error pages:
//!
//! - Discovers themes under a template root (or treats the root as the only
//!   theme)
//! - Validates each theme's structure, content and `theme.json` metadata
//! - Compiles the active theme into an immutable render set
//! - Switches themes at runtime, keeping the previous theme when the new one
//!   fails to compile
//! - Hot-reloads the active theme when its files change
//!
//! Rendering itself is MiniJinja, provided by [`livery_render`] and
//! re-exported here.
//!
//! ## Template Layout
//!
//! ```text
//! templates/
//! ├── default/
//! │   ├── layouts/layout.tmpl
//! │   ├── pages/home/index.tmpl
//! │   ├── singles/about.tmpl
//! │   ├── errors/404.tmpl
//! │   └── theme.json
//! └── dark/
//!     └── ...
//! ```
//!
//! A root that directly holds `layouts/`, `pages/`, `singles/` and `errors/`
//! is a single legacy theme named `default`.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use livery::{EmbeddedSource, Engine, EngineOptions};
//! use serde_json::json;
//!
//! static FILES: &[(&str, &str)] = &[
//!     ("light/layouts/layout.tmpl", "<light>{% block content %}{% endblock %}</light>"),
//!     ("light/pages/home/index.tmpl", "{% extends layout %}{% block content %}{{ title }}{% endblock %}"),
//!     ("light/singles/about.tmpl", "about"),
//!     ("light/errors/404.tmpl", "missing"),
//!     ("dark/layouts/layout.tmpl", "<dark>{% block content %}{% endblock %}</dark>"),
//!     ("dark/pages/home/index.tmpl", "{% extends layout %}{% block content %}{{ title }}{% endblock %}"),
//!     ("dark/singles/about.tmpl", "about"),
//!     ("dark/errors/404.tmpl", "missing"),
//! ];
//!
//! let engine = Engine::with_source(
//!     Arc::new(EmbeddedSource::new(FILES)),
//!     "",
//!     EngineOptions::new().theme("light"),
//! );
//! engine.init().unwrap();
//!
//! let mut out = Vec::new();
//! engine.render_page(&mut out, "home", &json!({ "title": "Hi" })).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "<light>Hi</light>");
//!
//! engine.switch_theme("dark").unwrap();
//! let mut out = Vec::new();
//! engine.render_page(&mut out, "home", &json!({ "title": "Hi" })).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "<dark>Hi</dark>");
//! ```
//!
//! ## Modules
//!
//! - [`discovery`]: mode detection, theme validation, metadata loading
//! - [`registry`]: the theme registry and the active render set
//! - [`watch`]: the file watch coordinator
//! - [`engine`]: the facade most applications use
//!
//! ## Logging
//!
//! Lifecycle events (discovery, switches, reloads, skipped themes, watch
//! failures) are emitted through [`tracing`]. Install any subscriber to see
//! them.

pub mod discovery;
pub mod engine;
mod error;
mod metadata;
mod options;
pub mod registry;
mod theme;
pub mod watch;

pub use discovery::{DiscoveryMode, ThemeDiscovery, PARTIALS_DIR, REQUIRED_DIRS};
pub use engine::{Engine, EngineBuilder};
pub use error::{ThemeError, ThemeErrorKind, ThemeResult};
pub use metadata::{validate_metadata, ThemeMetadata, DEFAULT_VERSION, METADATA_FILE};
pub use options::{EngineOptions, RenderOptions, DEFAULT_LAYOUT, DEFAULT_SUFFIX};
pub use registry::{RegistryStatus, ThemeRegistry};
pub use theme::{Theme, LEGACY_THEME_NAME};
pub use watch::{WatchCoordinator, WatchError};

// Rendering layer
pub use livery_render::{
    naming, EmbeddedSource, EmptyRenderSet, FsSource, FunctionTable, MiniJinjaLoader,
    MiniJinjaRenderSet, RenderError, RenderSet, RenderStats, TemplateCategory, TemplateLoader,
    ThemeSource, TEMPLATE_EXTENSIONS,
};

#[cfg(feature = "macros")]
pub use livery_macros::embed_themes;
