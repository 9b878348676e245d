//! The engine facade.
//!
//! [`Engine`] composes discovery, the registry and the watch coordinator and is
//! what applications hold on to. It resolves logical page, single and error
//! requests into render keys and renders them against the active theme.
//!
//! ```rust,no_run
//! use livery::{Engine, EngineOptions};
//! use serde_json::json;
//!
//! let engine = Engine::new("templates", EngineOptions::new().theme("dark"));
//! engine.init().unwrap();
//! let _ = engine.watch();
//!
//! let mut out = Vec::new();
//! engine.render_page(&mut out, "home", &json!({ "title": "Welcome" })).unwrap();
//!
//! engine.switch_theme("light").unwrap();
//! ```

use std::borrow::Cow;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use livery_render::{
    naming, FsSource, FunctionTable, MiniJinjaLoader, RenderError, RenderSet, TemplateLoader,
    ThemeSource,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::discovery::ThemeDiscovery;
use crate::error::{ThemeError, ThemeResult};
use crate::metadata::ThemeMetadata;
use crate::options::{EngineOptions, RenderOptions};
use crate::registry::ThemeRegistry;
use crate::theme::LEGACY_THEME_NAME;
use crate::watch::{ReloadFn, WatchCoordinator, WatchError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderKind {
    Page,
    Single,
    Error,
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    source: Arc<dyn ThemeSource>,
    root: PathBuf,
    loader: Arc<dyn TemplateLoader>,
    functions: FunctionTable,
    options: EngineOptions,
}

impl EngineBuilder {
    pub fn new(source: Arc<dyn ThemeSource>, root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            root: root.into(),
            loader: Arc::new(MiniJinjaLoader),
            functions: FunctionTable::new(),
            options: EngineOptions::default(),
        }
    }

    pub fn loader(mut self, loader: Arc<dyn TemplateLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn functions(mut self, functions: FunctionTable) -> Self {
        self.functions = functions;
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the engine. Call [`Engine::init`] before rendering.
    pub fn build(self) -> Engine {
        let discovery = ThemeDiscovery::new(self.source, self.root);
        Engine {
            registry: Arc::new(ThemeRegistry::new(discovery, self.loader, self.functions)),
            options: self.options,
            fallback: Arc::new(AtomicBool::new(false)),
            watcher: Mutex::new(None),
        }
    }
}

/// Theme-aware template engine.
pub struct Engine {
    registry: Arc<ThemeRegistry>,
    options: EngineOptions,
    fallback: Arc<AtomicBool>,
    watcher: Mutex<Option<WatchCoordinator>>,
}

impl Engine {
    /// Engine over a template directory on the local filesystem.
    pub fn new(dir: impl Into<PathBuf>, options: EngineOptions) -> Self {
        Self::builder(Arc::new(FsSource), dir).options(options).build()
    }

    /// Engine over any theme source, such as an embedded archive.
    pub fn with_source(
        source: Arc<dyn ThemeSource>,
        root: impl Into<PathBuf>,
        options: EngineOptions,
    ) -> Self {
        Self::builder(source, root).options(options).build()
    }

    pub fn builder(source: Arc<dyn ThemeSource>, root: impl Into<PathBuf>) -> EngineBuilder {
        EngineBuilder::new(source, root)
    }

    /// Discovers themes and activates the requested one.
    ///
    /// When discovery fails the template root is served directly and theme
    /// switching is unavailable. A requested theme that cannot be activated is
    /// logged and the discovered default stays active.
    pub fn init(&self) -> ThemeResult<()> {
        match self.registry.discover() {
            Ok(mode) => {
                self.fallback.store(false, Ordering::SeqCst);
                if let Some(target) = self.options.requested_theme() {
                    if let Err(err) = self.registry.switch_theme(target) {
                        tracing::warn!(
                            theme = target,
                            error = %err,
                            "requested theme unavailable, keeping discovered default"
                        );
                    }
                }
                self.move_watch_to_active();
                tracing::info!(
                    mode = ?mode,
                    theme = %self.registry.current_theme(),
                    "engine ready"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "theme discovery failed, using template root");
                self.fallback.store(true, Ordering::SeqCst);
                self.registry.load_fallback().map_err(|_| {
                    ThemeError::load_failed(
                        "",
                        "theme discovery failed and the template root could not be loaded",
                    )
                    .with_source(err)
                })?;
                self.move_watch_to_active();
                Ok(())
            }
        }
    }

    /// Engine registry.
    ///
    /// Switching themes through the registry directly leaves a running watch
    /// on the previous theme; use [`Engine::switch_theme`] instead.
    pub fn registry(&self) -> &Arc<ThemeRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// True when serving the template root without discovered themes.
    pub fn is_fallback(&self) -> bool {
        self.fallback.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Watching
    // =========================================================================

    /// Starts watching the active theme for template changes.
    ///
    /// Does nothing if already watching. Fails with
    /// [`WatchError::Unsupported`] for embedded sources.
    pub fn watch(&self) -> Result<(), WatchError> {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }

        let source = self.registry.source();
        if source.is_embedded() {
            return Err(WatchError::Unsupported);
        }
        let root = self
            .registry
            .current_root()
            .ok_or_else(|| WatchError::InvalidRoot(self.registry.discovery().root().to_path_buf()))?;

        let registry = Arc::downgrade(&self.registry);
        let reload: ReloadFn = Arc::new(move || {
            if let Some(registry) = registry.upgrade() {
                if let Err(err) = registry.reload_current_theme() {
                    tracing::warn!(error = %err, "template reload failed");
                }
            }
        });

        *slot = Some(WatchCoordinator::start(source.as_ref(), &root, reload)?);
        Ok(())
    }

    /// Stops any running watch and starts a fresh one on the active theme.
    pub fn restart_watching(&self) -> Result<(), WatchError> {
        if let Some(mut watcher) = self.watcher.lock().take() {
            watcher.shutdown();
        }
        self.watch()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    /// Directories currently watched, sorted. Empty when not watching.
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.watcher
            .lock()
            .as_ref()
            .map(|watcher| watcher.watched_directories())
            .unwrap_or_default()
    }

    /// Stops watching. Safe to call more than once.
    pub fn close(&self) {
        if let Some(mut watcher) = self.watcher.lock().take() {
            watcher.shutdown();
        }
    }

    // =========================================================================
    // Themes
    // =========================================================================

    /// Switches the active theme and moves the watch to it.
    ///
    /// If moving the watch fails the switch still stands; the failure is
    /// logged.
    pub fn switch_theme(&self, name: &str) -> ThemeResult<()> {
        if self.is_fallback() {
            return Err(ThemeError::switch_failed(
                name,
                "theme switching is unavailable without discovered themes",
            ));
        }
        self.registry.switch_theme(name)?;
        self.move_watch_to_active();
        Ok(())
    }

    /// Points a running watch at the active theme. Failures are logged only.
    fn move_watch_to_active(&self) {
        let slot = self.watcher.lock();
        let Some(watcher) = slot.as_ref() else {
            return;
        };
        let moved = match self.registry.current_watch_path() {
            Some(root) => watcher.reroot(&root),
            None => Err(WatchError::InvalidRoot(
                self.registry.current_root().unwrap_or_default(),
            )),
        };
        if let Err(err) = moved {
            tracing::warn!(
                theme = %self.registry.current_theme(),
                error = %err,
                "active theme changed but watch was not moved"
            );
        }
    }

    /// Rebuilds the active render set from disk.
    pub fn reload_current_theme(&self) -> ThemeResult<()> {
        self.registry.reload_current_theme()
    }

    pub fn available_themes(&self) -> Vec<String> {
        if self.is_fallback() {
            return vec![LEGACY_THEME_NAME.to_string()];
        }
        self.registry.available_themes()
    }

    pub fn current_theme(&self) -> String {
        if self.is_fallback() {
            return LEGACY_THEME_NAME.to_string();
        }
        self.registry.current_theme()
    }

    pub fn theme_exists(&self, name: &str) -> bool {
        if self.is_fallback() {
            return name == LEGACY_THEME_NAME;
        }
        self.registry.theme_exists(name)
    }

    pub fn theme_metadata(&self, name: &str) -> ThemeResult<ThemeMetadata> {
        if self.is_fallback() {
            return if name == LEGACY_THEME_NAME {
                Ok(ThemeMetadata::legacy())
            } else {
                Err(ThemeError::not_found(name, "theme not found in legacy mode"))
            };
        }
        self.registry.theme_metadata(name)
    }

    /// True when multi-theme error resolution is enabled and themes were
    /// discovered.
    pub fn is_multi_theme_mode(&self) -> bool {
        self.options.multi_theme && !self.is_fallback()
    }

    // =========================================================================
    // Names
    // =========================================================================

    pub fn page_name(&self, name: &str) -> String {
        naming::page_key(&self.options.layout, name)
    }

    pub fn single_name(&self, name: &str) -> String {
        naming::single_key(name, &self.options.suffix)
    }

    /// Render key for an error page against the active render set.
    pub fn error_name(&self, name: &str) -> String {
        self.resolve_error(self.registry.render_set().as_ref(), name, &self.options)
    }

    fn resolve_error(&self, set: &dyn RenderSet, name: &str, options: &EngineOptions) -> String {
        let [error_wrapped, single_wrapped, plain] = naming::error_candidates(name, &options.suffix);
        if self.is_multi_theme_mode() {
            if set.has(&error_wrapped) {
                return error_wrapped;
            }
            if set.has(&single_wrapped) {
                return single_wrapped;
            }
        }
        plain
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    pub fn render_page<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &T,
    ) -> Result<(), RenderError> {
        self.render(out, RenderKind::Page, name, data, None)
    }

    pub fn render_page_with<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &T,
        overrides: &RenderOptions,
    ) -> Result<(), RenderError> {
        self.render(out, RenderKind::Page, name, data, Some(overrides))
    }

    pub fn render_single<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &T,
    ) -> Result<(), RenderError> {
        self.render(out, RenderKind::Single, name, data, None)
    }

    pub fn render_single_with<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &T,
        overrides: &RenderOptions,
    ) -> Result<(), RenderError> {
        self.render(out, RenderKind::Single, name, data, Some(overrides))
    }

    pub fn render_error<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &T,
    ) -> Result<(), RenderError> {
        self.render(out, RenderKind::Error, name, data, None)
    }

    pub fn render_error_with<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &T,
        overrides: &RenderOptions,
    ) -> Result<(), RenderError> {
        self.render(out, RenderKind::Error, name, data, Some(overrides))
    }

    fn render<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        kind: RenderKind,
        name: &str,
        data: &T,
        overrides: Option<&RenderOptions>,
    ) -> Result<(), RenderError> {
        let options = match overrides {
            Some(overrides) => Cow::Owned(self.options.with_overrides(overrides)),
            None => Cow::Borrowed(&self.options),
        };

        let mut context = match serde_json::to_value(data)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(RenderError::ContextError(
                    "render data must serialize to a map".to_string(),
                ))
            }
        };
        context.insert(
            "constant".to_string(),
            Value::Object(options.global_constant.clone()),
        );
        context.insert(
            "variable".to_string(),
            Value::Object(options.global_variable.clone()),
        );

        // One snapshot for both key resolution and execution.
        let set = self.registry.render_set();
        let key = match kind {
            RenderKind::Page => naming::page_key(&options.layout, name),
            RenderKind::Single => naming::single_key(name, &options.suffix),
            RenderKind::Error => self.resolve_error(set.as_ref(), name, &options),
        };
        set.execute(&key, out, &Value::Object(context))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("root", &self.registry.discovery().root())
            .field("options", &self.options)
            .field("fallback", &self.is_fallback())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThemeErrorKind;
    use livery_render::EmbeddedSource;
    use serde_json::json;

    static THEMES: &[(&str, &str)] = &[
        ("classic/layouts/layout.tmpl", "<c>{% block content %}{% endblock %}</c>"),
        (
            "classic/pages/home/index.tmpl",
            "{% extends layout %}{% block content %}{{ title }}|{{ constant.site }}{% endblock %}",
        ),
        ("classic/singles/about.tmpl", "about {{ variable.who }}"),
        ("classic/errors/404.tmpl", "classic missing"),
        ("modern/layouts/layout.tmpl", "<m>{% block content %}{% endblock %}</m>"),
        ("modern/layouts/error.tmpl", "<e>{% block content %}{% endblock %}</e>"),
        (
            "modern/pages/home/index.tmpl",
            "{% extends layout %}{% block content %}{{ title }}{% endblock %}",
        ),
        ("modern/singles/about.tmpl", "modern about"),
        ("modern/errors/404.tmpl", "modern missing"),
    ];

    fn engine(options: EngineOptions) -> Engine {
        let engine = Engine::with_source(Arc::new(EmbeddedSource::new(THEMES)), "", options);
        engine.init().unwrap();
        engine
    }

    fn page(engine: &Engine, data: Value) -> String {
        let mut out = Vec::new();
        engine.render_page(&mut out, "home", &data).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_init_uses_discovered_default() {
        let engine = engine(EngineOptions::new());
        assert_eq!(engine.current_theme(), "classic");
        assert_eq!(engine.available_themes(), vec!["classic", "modern"]);
        assert!(!engine.is_fallback());
    }

    #[test]
    fn test_init_honours_requested_theme() {
        let engine = engine(EngineOptions::new().default_theme("modern"));
        assert_eq!(engine.current_theme(), "modern");
    }

    #[test]
    fn test_unknown_requested_theme_is_not_fatal() {
        let engine = engine(EngineOptions::new().theme("ghost"));
        assert_eq!(engine.current_theme(), "classic");
    }

    #[test]
    fn test_render_injects_constants_and_variables() {
        let mut constant = Map::new();
        constant.insert("site".into(), json!("Example"));
        let mut variable = Map::new();
        variable.insert("who".into(), json!("us"));
        let engine = engine(
            EngineOptions::new()
                .global_constant(constant)
                .global_variable(variable),
        );

        assert_eq!(page(&engine, json!({ "title": "Hi" })), "<c>Hi|Example</c>");

        let mut out = Vec::new();
        engine.render_single(&mut out, "about", &json!(null)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "about us");
    }

    #[test]
    fn test_render_rejects_scalar_data() {
        let engine = engine(EngineOptions::new());
        let mut out = Vec::new();
        let err = engine.render_page(&mut out, "home", &42).unwrap_err();
        assert!(matches!(err, RenderError::ContextError(_)));
    }

    #[test]
    fn test_switch_changes_output() {
        let engine = engine(EngineOptions::new());
        engine.switch_theme("modern").unwrap();
        assert_eq!(page(&engine, json!({ "title": "Hi" })), "<m>Hi</m>");

        let err = engine.switch_theme("ghost").unwrap_err();
        assert_eq!(err.kind(), ThemeErrorKind::NotFound);
        assert_eq!(engine.current_theme(), "modern");
    }

    #[test]
    fn test_render_with_layout_override() {
        let engine = engine(EngineOptions::new().theme("modern"));
        let mut out = Vec::new();
        engine
            .render_page_with(
                &mut out,
                "home",
                &json!({ "title": "Hi" }),
                &RenderOptions::new().layout("error.tmpl"),
            )
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<e>Hi</e>");
    }

    #[test]
    fn test_names() {
        let engine = engine(EngineOptions::new().suffix("tmpl"));
        assert_eq!(engine.page_name("home"), "layout.tmpl:pages/home");
        assert_eq!(engine.single_name("about"), "singles/about.tmpl");
        assert_eq!(engine.error_name("404"), "error/404.tmpl");
    }

    #[test]
    fn test_error_name_in_multi_theme_mode() {
        static WRAPPED: &[(&str, &str)] = &[
            ("t/layouts/layout.tmpl", "{% block content %}{% endblock %}"),
            ("t/pages/home/index.tmpl", "{% extends layout %}"),
            ("t/singles/about.tmpl", "a"),
            ("t/errors/404.tmpl", "e"),
        ];
        let engine = Engine::with_source(
            Arc::new(EmbeddedSource::new(WRAPPED)),
            "",
            EngineOptions::new().multi_theme(true),
        );
        engine.init().unwrap();
        assert!(!engine.is_fallback());
        assert!(engine.is_multi_theme_mode());
        assert_eq!(engine.current_theme(), "t");
        assert!(engine.registry().has_template("layout.tmpl:pages/home"));
        // No wrapped error key is published, so the plain key wins.
        assert_eq!(engine.error_name("404"), "error/404.tmpl");

        let mut out = Vec::new();
        engine.render_error(&mut out, "404", &json!({})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "e");
    }

    #[test]
    fn test_fallback_mode() {
        static LOOSE: &[(&str, &str)] = &[("singles/about.tmpl", "loose")];
        let engine = Engine::with_source(
            Arc::new(EmbeddedSource::new(LOOSE)),
            "",
            EngineOptions::new(),
        );
        engine.init().unwrap();

        assert!(engine.is_fallback());
        assert_eq!(engine.current_theme(), "default");
        assert_eq!(engine.available_themes(), vec!["default"]);
        assert!(engine.theme_exists("default"));
        assert_eq!(
            engine.theme_metadata("default").unwrap().display_name,
            "Default Theme"
        );
        assert!(engine.theme_metadata("dark").unwrap_err().is_not_found());
        assert_eq!(
            engine.switch_theme("dark").unwrap_err().kind(),
            ThemeErrorKind::SwitchFailed
        );

        let mut out = Vec::new();
        engine.render_single(&mut out, "about", &json!({})).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "loose");
        engine.reload_current_theme().unwrap();
    }

    #[test]
    fn test_watch_unsupported_for_embedded() {
        let engine = engine(EngineOptions::new());
        assert!(matches!(engine.watch(), Err(WatchError::Unsupported)));
        assert!(!engine.is_watching());
        assert!(engine.watched_directories().is_empty());
        engine.close();
        engine.close();
    }
}
