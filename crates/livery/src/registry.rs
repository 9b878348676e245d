//! The theme registry: discovered themes plus the one active render set.
//!
//! State transitions:
//!
//! ```text
//! Undiscovered ──discover──▶ Discovered ──switch/reload──▶ Discovered
//!       │                        │
//!       └──────discover──────────┴──▶ Failed (no valid theme, or initial load failed)
//! ```
//!
//! Discover, load, switch and reload are serialized by one lock. The active
//! render set is an `Arc` swapped wholesale under a read-write lock, so a render
//! call sees either the old set or the new one, never a mix.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use livery_render::{
    EmptyRenderSet, FunctionTable, RenderError, RenderSet, RenderStats, TemplateLoader,
    ThemeSource,
};
use parking_lot::{Mutex, RwLock};

use crate::discovery::{theme_name, DiscoveryMode, ThemeDiscovery};
use crate::error::{ThemeError, ThemeResult};
use crate::metadata::ThemeMetadata;
use crate::theme::{Theme, LEGACY_THEME_NAME};

/// Lifecycle status of a [`ThemeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum RegistryStatus {
    Undiscovered,
    Discovered,
    /// Discovery found no usable theme, or the initial theme failed to load.
    Failed,
    /// The root is served directly, without registered themes.
    Fallback,
}

#[derive(Debug)]
struct RegistryState {
    status: RegistryStatus,
    mode: Option<DiscoveryMode>,
    themes: BTreeMap<String, Theme>,
    current: String,
    default: String,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            status: RegistryStatus::Undiscovered,
            mode: None,
            themes: BTreeMap::new(),
            current: String::new(),
            default: String::new(),
        }
    }

    fn theme(&self, name: &str) -> ThemeResult<&Theme> {
        self.themes
            .get(name)
            .ok_or_else(|| ThemeError::not_found(name, "theme not found"))
    }
}

/// Owns the discovered themes, the current theme name and the active render set.
pub struct ThemeRegistry {
    discovery: ThemeDiscovery,
    loader: Arc<dyn TemplateLoader>,
    functions: FunctionTable,
    state: Mutex<RegistryState>,
    active: RwLock<Arc<dyn RenderSet>>,
    generation: AtomicU64,
}

impl ThemeRegistry {
    pub fn new(
        discovery: ThemeDiscovery,
        loader: Arc<dyn TemplateLoader>,
        functions: FunctionTable,
    ) -> Self {
        Self {
            discovery,
            loader,
            functions,
            state: Mutex::new(RegistryState::new()),
            active: RwLock::new(Arc::new(EmptyRenderSet)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn discovery(&self) -> &ThemeDiscovery {
        &self.discovery
    }

    pub fn source(&self) -> &Arc<dyn ThemeSource> {
        self.discovery.source()
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Rebuilds the theme table from scratch and loads the initial theme.
    ///
    /// In multi-theme mode invalid candidates are skipped with a warning; only
    /// the absence of any valid theme is an error.
    pub fn discover(&self) -> ThemeResult<DiscoveryMode> {
        let mut state = self.state.lock();
        *state = RegistryState::new();

        let result = self.discover_locked(&mut state);
        state.status = match &result {
            Ok(_) => RegistryStatus::Discovered,
            Err(_) => RegistryStatus::Failed,
        };
        result
    }

    fn discover_locked(&self, state: &mut RegistryState) -> ThemeResult<DiscoveryMode> {
        let mode = self.discovery.detect_mode()?;
        state.mode = Some(mode);

        let initial = match mode {
            DiscoveryMode::Legacy => self.register_legacy(state)?,
            DiscoveryMode::MultiTheme => self.register_candidates(state)?,
        };

        state.default = initial.clone();
        state.current = initial.clone();

        tracing::info!(
            mode = ?mode,
            themes = ?state.themes.keys().collect::<Vec<_>>(),
            current = %initial,
            "discovered themes"
        );

        self.load_locked(state, &initial).map_err(|err| {
            ThemeError::load_failed(&initial, "failed to load initial theme during discovery")
                .with_source(err)
        })?;
        Ok(mode)
    }

    fn register_legacy(&self, state: &mut RegistryState) -> ThemeResult<String> {
        let root = self.discovery.root();
        let metadata = self
            .discovery
            .validate_theme(root)
            .and_then(|_| self.discovery.load_metadata(root))
            .map_err(|err| {
                ThemeError::not_found(LEGACY_THEME_NAME, "no valid theme found: invalid legacy theme")
                    .with_source(err)
            })?;

        state.themes.insert(
            LEGACY_THEME_NAME.to_string(),
            Theme {
                name: LEGACY_THEME_NAME.to_string(),
                root: root.to_path_buf(),
                is_default: true,
                is_embedded: self.source().is_embedded(),
                metadata,
            },
        );
        Ok(LEGACY_THEME_NAME.to_string())
    }

    fn register_candidates(&self, state: &mut RegistryState) -> ThemeResult<String> {
        let is_embedded = self.source().is_embedded();

        for path in self.discovery.candidates()? {
            let name = theme_name(&path);
            let metadata = match self
                .discovery
                .validate_theme(&path)
                .and_then(|_| self.discovery.load_metadata(&path))
            {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(theme = %name, error = %err, "skipping invalid theme");
                    continue;
                }
            };

            state.themes.insert(
                name.clone(),
                Theme {
                    name,
                    root: path,
                    is_default: false,
                    is_embedded,
                    metadata,
                },
            );
        }

        // A theme named "default" wins, otherwise the first by name.
        let initial = if state.themes.contains_key(LEGACY_THEME_NAME) {
            LEGACY_THEME_NAME.to_string()
        } else {
            state.themes.keys().next().cloned().ok_or_else(|| {
                ThemeError::not_found(
                    "",
                    format!(
                        "no valid themes found in {}",
                        self.discovery.root().display()
                    ),
                )
            })?
        };
        if let Some(theme) = state.themes.get_mut(&initial) {
            theme.is_default = true;
        }
        Ok(initial)
    }

    /// Serves the template root directly when discovery fails.
    ///
    /// No theme is registered; switching is unavailable until a later
    /// successful [`discover`](Self::discover).
    pub fn load_fallback(&self) -> ThemeResult<()> {
        let mut state = self.state.lock();
        *state = RegistryState::new();
        state.status = RegistryStatus::Fallback;

        let root = self.discovery.root().to_path_buf();
        let set = self.compile("", &root)?;
        tracing::warn!(
            root = %root.display(),
            templates = set.len(),
            "no valid theme, serving template root directly"
        );
        self.install(set);
        Ok(())
    }

    // =========================================================================
    // Loading and switching
    // =========================================================================

    fn compile(&self, name: &str, root: &Path) -> ThemeResult<Arc<dyn RenderSet>> {
        self.loader
            .load(self.source().as_ref(), root, &self.functions)
            .map_err(|err| {
                ThemeError::load_failed(name, "failed to load theme templates").with_source(err)
            })
    }

    fn install(&self, set: Arc<dyn RenderSet>) {
        *self.active.write() = set;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Compiles `name` and installs the result, even when it turns out empty.
    fn load_locked(&self, state: &RegistryState, name: &str) -> ThemeResult<()> {
        let theme = state.theme(name)?;
        let set = self.compile(name, &theme.root)?;
        let empty = set.is_empty();
        self.install(set);

        if empty {
            return Err(ThemeError::load_failed(
                name,
                format!("render set contains no templates for theme {}", name),
            ));
        }
        Ok(())
    }

    /// Rebuilds the active render set from `name`.
    ///
    /// Does not change the current theme name.
    pub fn load_theme(&self, name: &str) -> ThemeResult<()> {
        let state = self.state.lock();
        self.load_locked(&state, name)
    }

    /// Makes `name` the active theme.
    ///
    /// Switching to the current theme is a no-op. On failure the previous theme
    /// name and render set remain active and the error is
    /// [`ThemeErrorKind::SwitchFailed`](crate::ThemeErrorKind::SwitchFailed)
    /// wrapping the cause.
    ///
    /// A registry owned by an [`Engine`](crate::Engine) does not move the
    /// engine's watch; switch through [`Engine::switch_theme`](crate::Engine::switch_theme).
    pub fn switch_theme(&self, name: &str) -> ThemeResult<()> {
        let mut state = self.state.lock();

        if state.current == name {
            return Ok(());
        }
        let root = state.theme(name)?.root.clone();
        let previous = state.current.clone();

        // The candidate is staged and published only once it has validated, so
        // the previous set never leaves the active slot on failure.
        let staged = self
            .compile(name, &root)
            .and_then(|set| validate_render_set(name, set.as_ref()).map(|_| set))
            .map_err(|err| {
                tracing::warn!(theme = %name, previous = %previous, error = %err, "theme switch rolled back");
                ThemeError::switch_failed(name, "failed to load new theme during switch")
                    .with_source(err)
            })?;

        self.install(staged);
        state.current = name.to_string();
        tracing::info!(theme = %name, previous = %previous, "switched theme");
        Ok(())
    }

    /// Switches to the default theme.
    pub fn switch_to_default_theme(&self) -> ThemeResult<()> {
        let default = self.default_theme();
        if default.is_empty() {
            return Err(ThemeError::not_found("", "no default theme configured"));
        }
        self.switch_theme(&default)
    }

    /// Reloads the current theme in place.
    ///
    /// Unlike [`switch_theme`](Self::switch_theme) there is nothing to roll
    /// back to: on failure the registry keeps whatever the loader produced.
    /// In fallback mode the template root is recompiled instead.
    pub fn reload_current_theme(&self) -> ThemeResult<()> {
        let state = self.state.lock();
        if state.status == RegistryStatus::Fallback {
            let root = self.discovery.root().to_path_buf();
            let set = self.compile("", &root)?;
            tracing::debug!(root = %root.display(), templates = set.len(), "reloaded template root");
            self.install(set);
            return Ok(());
        }
        if state.current.is_empty() {
            return Err(ThemeError::load_failed("", "no current theme to reload"));
        }

        self.load_locked(&state, &state.current)?;
        let set = self.render_set();
        validate_render_set(&state.current, set.as_ref())?;
        tracing::debug!(theme = %state.current, templates = set.len(), "reloaded theme");
        Ok(())
    }

    /// Compiles a theme without touching the active render set.
    pub fn preload_theme(&self, name: &str) -> ThemeResult<()> {
        let root = {
            let state = self.state.lock();
            state
                .theme(name)
                .map_err(|_| ThemeError::not_found(name, "theme not found for preloading"))?
                .root
                .clone()
        };

        let set = self.compile(name, &root)?;
        if set.is_empty() {
            return Err(ThemeError::load_failed(
                name,
                "preloaded theme contains no templates",
            ));
        }
        Ok(())
    }

    /// Marks `name` as the default theme.
    pub fn set_default_theme(&self, name: &str) -> ThemeResult<()> {
        let mut state = self.state.lock();
        if !state.themes.contains_key(name) {
            return Err(ThemeError::not_found(
                name,
                "cannot set non-existent theme as default",
            ));
        }

        state.default = name.to_string();
        for theme in state.themes.values_mut() {
            theme.is_default = theme.name == name;
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Registered theme names, sorted.
    pub fn available_themes(&self) -> Vec<String> {
        self.state.lock().themes.keys().cloned().collect()
    }

    pub fn current_theme(&self) -> String {
        self.state.lock().current.clone()
    }

    pub fn default_theme(&self) -> String {
        self.state.lock().default.clone()
    }

    pub fn theme_exists(&self, name: &str) -> bool {
        self.state.lock().themes.contains_key(name)
    }

    pub fn theme(&self, name: &str) -> Option<Theme> {
        self.state.lock().themes.get(name).cloned()
    }

    pub fn theme_metadata(&self, name: &str) -> ThemeResult<ThemeMetadata> {
        let state = self.state.lock();
        state.theme(name).map(|theme| theme.metadata.clone())
    }

    pub fn mode(&self) -> Option<DiscoveryMode> {
        self.state.lock().mode
    }

    pub fn status(&self) -> RegistryStatus {
        self.state.lock().status
    }

    /// Root of the current theme, or of the template root in fallback mode.
    pub fn current_root(&self) -> Option<PathBuf> {
        let state = self.state.lock();
        match state.status {
            RegistryStatus::Fallback => Some(self.discovery.root().to_path_buf()),
            _ => state.themes.get(&state.current).map(|theme| theme.root.clone()),
        }
    }

    /// Watchable directory of the current theme, if the source supports it.
    pub fn current_watch_path(&self) -> Option<PathBuf> {
        self.current_root()
            .and_then(|root| self.source().watch_path(&root))
    }

    /// Snapshot of the active render set.
    pub fn render_set(&self) -> Arc<dyn RenderSet> {
        self.active.read().clone()
    }

    /// Renders `key` with the active render set.
    pub fn render(
        &self,
        key: &str,
        out: &mut dyn Write,
        data: &serde_json::Value,
    ) -> Result<(), RenderError> {
        let set = self.render_set();
        set.execute(key, out, data)
    }

    pub fn render_stats(&self) -> RenderStats {
        RenderStats::of(self.render_set().as_ref())
    }

    /// Checks that the active render set is usable.
    pub fn validate_render_integrity(&self) -> ThemeResult<()> {
        let current = self.current_theme();
        validate_render_set(&current, self.render_set().as_ref())
    }

    pub fn template_names(&self) -> Vec<String> {
        self.render_set().keys()
    }

    pub fn has_template(&self, key: &str) -> bool {
        self.render_set().has(key)
    }

    /// Number of render sets installed so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ThemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeRegistry")
            .field("root", &self.discovery.root())
            .field("loader", &self.loader)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

fn validate_render_set(theme: &str, set: &dyn RenderSet) -> ThemeResult<()> {
    if set.is_empty() {
        return Err(ThemeError::load_failed(
            theme,
            "render set contains no templates",
        ));
    }
    if !RenderStats::of(set).has_renderable() {
        return Err(ThemeError::load_failed(
            theme,
            "render set contains no page, single or error templates",
        ));
    }
    Ok(())
}
