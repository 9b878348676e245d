//! Compiling a theme tree into a [`RenderSet`].
//!
//! The [`TemplateLoader`] trait is the seam between the theme lifecycle and the
//! template library. [`MiniJinjaLoader`] is the default implementation.
//!
//! # Render keys
//!
//! Every template file under the theme root is added to one MiniJinja
//! environment under its root-relative path, so templates can include each
//! other (`{% include "partials/nav.tmpl" %}`). On top of that the loader
//! publishes render keys:
//!
//! - `error/<file>` for each file directly in `errors/`
//! - `singles/<file>` for each file directly in `singles/`
//! - `<layout>:pages/<dir>` for each layout in `layouts/` and each directory
//!   under `pages/` that holds template files
//!
//! A page directory's entry template is its `index.*` file, or the first file
//! by name when there is no index. Page entries are rendered with `layout`
//! bound to the layout's template name, so a page starts with
//! `{% extends layout %}` and works under every layout of the theme.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Value};

use crate::error::RenderError;
use crate::functions::FunctionTable;
use crate::naming::{self, ERROR_PREFIX, SINGLES_PREFIX};
use crate::render_set::RenderSet;
use crate::source::{walk_templates, ThemeSource};

/// Builds a render set from a theme root.
pub trait TemplateLoader: Send + Sync + fmt::Debug {
    fn load(
        &self,
        source: &dyn ThemeSource,
        root: &Path,
        functions: &FunctionTable,
    ) -> Result<Arc<dyn RenderSet>, RenderError>;
}

/// MiniJinja-backed loader with HTML auto-escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaLoader;

impl MiniJinjaLoader {
    pub fn new() -> Self {
        MiniJinjaLoader
    }
}

impl TemplateLoader for MiniJinjaLoader {
    fn load(
        &self,
        source: &dyn ThemeSource,
        root: &Path,
        functions: &FunctionTable,
    ) -> Result<Arc<dyn RenderSet>, RenderError> {
        let files = walk_templates(source, root)?;

        let mut env = Environment::new();
        env.set_auto_escape_callback(|_name: &str| AutoEscape::Html);
        functions.apply(&mut env);

        let mut layouts = Vec::new();
        let mut page_dirs: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut entries = BTreeMap::new();

        for file in &files {
            let content = source.read_file(&file.path)?;
            env.add_template_owned(file.relative.clone(), content)?;

            let (dir, name) = match file.relative.rsplit_once('/') {
                Some(split) => split,
                None => continue,
            };

            match dir {
                "layouts" => layouts.push(name.to_string()),
                "errors" => {
                    entries.insert(format!("{}{}", ERROR_PREFIX, name), Entry::plain(&file.relative));
                }
                "singles" => {
                    entries.insert(format!("{}{}", SINGLES_PREFIX, name), Entry::plain(&file.relative));
                }
                _ => {
                    if let Some(page) = dir.strip_prefix("pages/") {
                        page_dirs
                            .entry(page.to_string())
                            .or_default()
                            .push(file.relative.clone());
                    }
                }
            }
        }

        for (page, templates) in &page_dirs {
            let entry = page_entry(templates);
            for layout in &layouts {
                entries.insert(
                    naming::page_key(layout, page),
                    Entry {
                        template: entry.clone(),
                        layout: Some(format!("layouts/{}", layout)),
                    },
                );
            }
        }

        tracing::debug!(
            root = %root.display(),
            templates = files.len(),
            keys = entries.len(),
            "compiled theme"
        );

        Ok(Arc::new(MiniJinjaRenderSet { env, entries }))
    }
}

/// Picks the entry template of a page directory. `templates` is sorted.
fn page_entry(templates: &[String]) -> String {
    templates
        .iter()
        .find(|t| {
            t.rsplit_once('/')
                .map(|(_, name)| name.starts_with("index."))
                .unwrap_or(false)
        })
        .or_else(|| templates.first())
        .cloned()
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
struct Entry {
    template: String,
    layout: Option<String>,
}

impl Entry {
    fn plain(template: &str) -> Self {
        Self {
            template: template.to_string(),
            layout: None,
        }
    }
}

/// Render set produced by [`MiniJinjaLoader`].
pub struct MiniJinjaRenderSet {
    env: Environment<'static>,
    entries: BTreeMap<String, Entry>,
}

impl fmt::Debug for MiniJinjaRenderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniJinjaRenderSet")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RenderSet for MiniJinjaRenderSet {
    fn execute(
        &self,
        key: &str,
        out: &mut dyn Write,
        data: &serde_json::Value,
    ) -> Result<(), RenderError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| RenderError::TemplateNotFound(key.to_string()))?;

        let mut context = match data {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(RenderError::ContextError(format!(
                    "render data must be an object, got {}",
                    json_kind(other)
                )))
            }
        };
        if let Some(layout) = &entry.layout {
            context.insert("layout".to_string(), serde_json::Value::String(layout.clone()));
        }

        let template = self.env.get_template(&entry.template)?;
        template.render_to_write(Value::from_serialize(&context), out)?;
        Ok(())
    }

    fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
