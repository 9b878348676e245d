//! # Livery Render - Theme Storage and Compilation
//!
//! `livery-render` is the layer below the theme lifecycle in `livery`. It knows
//! how to read a theme tree and how to turn it into something that renders, and
//! nothing about which theme is active.
//!
//! ## Core Concepts
//!
//! - [`ThemeSource`]: uniform list/read/stat access to a theme tree, with
//!   [`FsSource`] for the filesystem and [`EmbeddedSource`] for files compiled
//!   into the binary
//! - [`RenderSet`]: one theme's compiled templates, addressed by render key
//! - [`TemplateLoader`]: builds a render set from a theme root;
//!   [`MiniJinjaLoader`] is the default
//! - [`FunctionTable`]: filters, functions and globals shared by every theme
//! - [`naming`]: the render-key convention shared by loaders and callers
//!
//! ## Quick Start
//!
//! ```rust
//! use livery_render::{EmbeddedSource, FunctionTable, MiniJinjaLoader, RenderSet, TemplateLoader};
//! use std::path::Path;
//!
//! static FILES: &[(&str, &str)] = &[
//!     ("layouts/layout.tmpl", "<body>{% block content %}{% endblock %}</body>"),
//!     ("pages/home/index.tmpl", "{% extends layout %}{% block content %}Hello {{ name }}{% endblock %}"),
//!     ("singles/about.tmpl", "About"),
//!     ("errors/404.tmpl", "Not found"),
//! ];
//!
//! let source = EmbeddedSource::new(FILES);
//! let set = MiniJinjaLoader.load(&source, Path::new(""), &FunctionTable::new()).unwrap();
//!
//! let mut out = Vec::new();
//! let key = livery_render::naming::page_key("layout.tmpl", "home");
//! set.execute(&key, &mut out, &serde_json::json!({ "name": "World" })).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "<body>Hello World</body>");
//! ```

mod error;
mod functions;
mod loader;
pub mod naming;
mod render_set;
pub mod source;

pub use error::RenderError;
pub use functions::FunctionTable;
pub use loader::{MiniJinjaLoader, MiniJinjaRenderSet, TemplateLoader};
pub use naming::TemplateCategory;
pub use render_set::{EmptyRenderSet, RenderSet, RenderStats};
pub use source::{
    is_template_file, walk_templates, EmbeddedSource, EntryKind, FsSource, SourceEntry,
    TemplateFile, ThemeSource, TEMPLATE_EXTENSIONS,
};
