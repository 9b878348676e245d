//! Keeps one filesystem watch aligned with the active theme.
//!
//! The coordinator watches every directory of the active theme individually
//! (non-recursively) and keeps that set up to date as directories appear and
//! disappear. Changes to template files trigger a full reload through a
//! callback. Events are drained by a single background thread that blocks on
//! the next event or on the shutdown signal.
//!
//! Classification is a pure function, [`classify_event`], so the rules can be
//! tested without a real watcher:
//!
//! | Event | Path | Action |
//! |-------|------|--------|
//! | any | outside the watch root | [`WatchAction::Ignore`] |
//! | create | directory | [`WatchAction::Watch`] |
//! | remove, rename | directory | [`WatchAction::Unwatch`] |
//! | create, write, remove, rename | template file | [`WatchAction::Reload`] |
//! | permission change | any | [`WatchAction::Ignore`] |

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use livery_render::{is_template_file, ThemeSource};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

/// Callback run on the watch thread when templates change.
pub type ReloadFn = Arc<dyn Fn() + Send + Sync>;

/// Errors from setting up or moving a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("file watching is not supported for embedded themes")]
    Unsupported,

    #[error("cannot watch {0}: not a directory on the local filesystem")]
    InvalidRoot(PathBuf),

    #[error("watch backend error: {0}")]
    Notify(#[from] notify::Error),

    #[error("I/O error while watching: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend-neutral event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Create,
    Write,
    Remove,
    Rename,
    PermissionChange,
    Other,
}

impl From<&EventKind> for WatchEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => WatchEventKind::Create,
            EventKind::Modify(ModifyKind::Name(_)) => WatchEventKind::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => WatchEventKind::PermissionChange,
            EventKind::Modify(_) => WatchEventKind::Write,
            EventKind::Remove(_) => WatchEventKind::Remove,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => WatchEventKind::Other,
        }
    }
}

/// What the coordinator does with one event path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchAction {
    /// Start watching a new directory (and everything below it).
    Watch,
    /// Stop watching a directory (and everything below it).
    Unwatch,
    /// Rebuild the active render set.
    Reload,
    Ignore,
}

/// Decides how to react to an event on `path` while `root` is being watched.
///
/// Paths are compared component-wise, so `/themes/dark-old` is not under
/// `/themes/dark`.
pub fn classify_event(kind: WatchEventKind, path: &Path, root: &Path, is_dir: bool) -> WatchAction {
    if !path.starts_with(root) {
        return WatchAction::Ignore;
    }

    match kind {
        WatchEventKind::PermissionChange | WatchEventKind::Other => WatchAction::Ignore,
        WatchEventKind::Create if is_dir => WatchAction::Watch,
        WatchEventKind::Remove | WatchEventKind::Rename if is_dir => WatchAction::Unwatch,
        WatchEventKind::Write if is_dir => WatchAction::Ignore,
        WatchEventKind::Create
        | WatchEventKind::Write
        | WatchEventKind::Remove
        | WatchEventKind::Rename => {
            let is_template = path
                .file_name()
                .map(|name| is_template_file(&name.to_string_lossy()))
                .unwrap_or(false);
            if is_template {
                WatchAction::Reload
            } else {
                WatchAction::Ignore
            }
        }
    }
}

struct WatchState {
    watcher: RecommendedWatcher,
    root: PathBuf,
    watched: BTreeSet<PathBuf>,
}

impl WatchState {
    /// Watches `dir` and every directory below it. Returns true if any
    /// template file was found along the way.
    fn watch_tree(&mut self, dir: &Path) -> Result<bool, WatchError> {
        if !self.watched.contains(dir) {
            self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
            self.watched.insert(dir.to_path_buf());
            tracing::debug!(path = %dir.display(), "watching directory");
        }

        let mut has_templates = false;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                has_templates |= self.watch_tree(&path)?;
            } else if path
                .file_name()
                .is_some_and(|name| is_template_file(&name.to_string_lossy()))
            {
                has_templates = true;
            }
        }
        Ok(has_templates)
    }

    fn unwatch_tree(&mut self, dir: &Path) {
        let doomed: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|path| path.starts_with(dir))
            .cloned()
            .collect();

        for path in doomed {
            // The backend drops watches on deleted directories by itself.
            let _ = self.watcher.unwatch(&path);
            self.watched.remove(&path);
            tracing::debug!(path = %path.display(), "stopped watching directory");
        }
    }

    fn unwatch_all(&mut self) {
        for path in std::mem::take(&mut self.watched) {
            let _ = self.watcher.unwatch(&path);
        }
    }
}

/// Owns the watch on the active theme and the thread draining its events.
pub struct WatchCoordinator {
    shared: Arc<Mutex<WatchState>>,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WatchCoordinator {
    /// Starts watching `root` and calls `reload` whenever a template changes.
    ///
    /// Fails with [`WatchError::Unsupported`] for embedded sources.
    pub fn start(source: &dyn ThemeSource, root: &Path, reload: ReloadFn) -> Result<Self, WatchError> {
        if source.is_embedded() {
            return Err(WatchError::Unsupported);
        }
        let root = source
            .watch_path(root)
            .ok_or_else(|| WatchError::InvalidRoot(root.to_path_buf()))?;

        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = event_tx.send(res);
        })?;

        let mut state = WatchState {
            watcher,
            root: root.clone(),
            watched: BTreeSet::new(),
        };
        state.watch_tree(&root)?;
        let shared = Arc::new(Mutex::new(state));

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let thread_state = shared.clone();
        let handle = std::thread::Builder::new()
            .name("livery-watch".to_string())
            .spawn(move || run(thread_state, event_rx, shutdown_rx, reload))?;

        tracing::info!(root = %root.display(), "started theme watcher");
        Ok(Self {
            shared,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Moves the watch to `new_root`, a directory on the local filesystem.
    ///
    /// Events still queued for the old root are ignored from here on.
    pub fn reroot(&self, new_root: &Path) -> Result<(), WatchError> {
        if !new_root.is_dir() {
            return Err(WatchError::InvalidRoot(new_root.to_path_buf()));
        }

        let mut state = self.shared.lock();
        state.unwatch_all();
        state.root = new_root.to_path_buf();
        state.watch_tree(new_root)?;
        tracing::info!(root = %new_root.display(), "moved theme watcher");
        Ok(())
    }

    /// Directories currently watched, sorted.
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.shared.lock().watched.iter().cloned().collect()
    }

    pub fn root(&self) -> PathBuf {
        self.shared.lock().root.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops the event thread and releases every watch. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            self.shared.lock().unwatch_all();
            tracing::info!("stopped theme watcher");
        }
    }
}

impl Drop for WatchCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchCoordinator")
            .field("root", &self.root())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run(
    shared: Arc<Mutex<WatchState>>,
    events: Receiver<notify::Result<notify::Event>>,
    shutdown: Receiver<()>,
    reload: ReloadFn,
) {
    loop {
        crossbeam_channel::select! {
            recv(shutdown) -> _ => break,
            recv(events) -> msg => match msg {
                Ok(Ok(event)) => {
                    if handle_event(&shared, &event) {
                        reload();
                    }
                }
                Ok(Err(err)) => tracing::warn!(error = %err, "watch backend reported an error"),
                Err(_) => break,
            },
        }
    }
}

/// Applies one event to the watch set. Returns true if a reload is due.
fn handle_event(shared: &Mutex<WatchState>, event: &notify::Event) -> bool {
    let kind = WatchEventKind::from(&event.kind);
    let mut state = shared.lock();
    let mut reload = false;

    for path in &event.paths {
        // Removed paths can no longer be inspected; the watch set knows which
        // of them were directories.
        let (kind, is_dir) = match kind {
            WatchEventKind::Remove => (kind, state.watched.contains(path)),
            WatchEventKind::Rename if state.watched.contains(path) => (kind, true),
            WatchEventKind::Rename if path.is_dir() => (WatchEventKind::Create, true),
            _ => (kind, path.is_dir()),
        };

        match classify_event(kind, path, &state.root, is_dir) {
            WatchAction::Watch => match state.watch_tree(path) {
                Ok(has_templates) => reload |= has_templates,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "cannot watch new directory")
                }
            },
            WatchAction::Unwatch => state.unwatch_tree(path),
            WatchAction::Reload => {
                tracing::debug!(path = %path.display(), event = ?kind, "template changed");
                reload = true;
            }
            WatchAction::Ignore => {}
        }
    }
    reload
}
