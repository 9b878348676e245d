//! Proc macros for livery.
//!
//! - [`embed_themes!`] - Embed a template root (every theme, template and
//!   `theme.json`) into the binary.
//!
//! The macro only reads files. Discovery, validation and compilation happen at
//! runtime against the returned `EmbeddedSource`, exactly as they do for a
//! directory on disk.

mod embed;

use proc_macro::TokenStream;
use syn::{parse_macro_input, LitStr};

/// Embeds a template root at compile time.
///
/// The path is resolved relative to the manifest directory of the crate
/// invoking the macro. The expansion is a `livery::EmbeddedSource` whose
/// paths are relative to that root, so an engine built over it uses `""` as
/// its root:
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use livery::{embed_themes, Engine, EngineOptions};
///
/// let source = embed_themes!("templates");
/// let engine = Engine::with_source(Arc::new(source), "", EngineOptions::new());
/// engine.init()?;
/// ```
///
/// # Collected Files
///
/// - Template files (`.tmpl`, `.html`, `.tpl`, `.jinja`, `.jinja2`, `.j2`)
/// - Theme metadata files (`theme.json`)
///
/// Anything else is skipped.
///
/// # Compile-Time Errors
///
/// The macro fails to compile if the directory does not exist, cannot be read
/// or holds a collected file that is not valid UTF-8.
#[proc_macro]
pub fn embed_themes(input: TokenStream) -> TokenStream {
    let path_lit = parse_macro_input!(input as LitStr);
    embed::embed_themes_impl(path_lit).into()
}
