//! # Hot Reload Module
//!
//! Live reloading of the setup module without restarting the server.
//!
//! [`WatchedSetup`] parses the setup file once, then watches its directory and
//! swaps in a freshly parsed snapshot whenever the file is modified or
//! recreated. Requests read the current snapshot lock-free, so a reload never
//! blocks dispatch.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use webdispatch::hot_reload::WatchedSetup;
//!
//! let setup = WatchedSetup::watch_with("app/setup.yaml", |snapshot| {
//!     println!("{} url lines", snapshot.urls.as_ref().map_or(0, Vec::len));
//! })?;
//! let dispatcher = Dispatcher::builder(setup).loader(registry).build();
//! ```
//!
//! ## Error Handling
//!
//! If the changed file fails to parse:
//! - The error is logged
//! - The previous snapshot remains active
//! - The server continues serving requests
//!
//! Editors that save by writing a temp file and renaming it over the original
//! are handled because the parent directory is watched, not the file itself.

use crate::setup::{Setup, SetupSource};
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

/// Wait before trusting that an empty setup file is not a save in progress.
const EMPTY_FILE_SETTLE: Duration = Duration::from_millis(50);

fn is_empty_or_missing(path: &Path) -> bool {
    std::fs::metadata(path).map_or(true, |m| m.len() == 0)
}

/// Setup source backed by a watched file.
pub struct WatchedSetup {
    path: PathBuf,
    current: Arc<ArcSwap<Setup>>,
    reloads: Arc<AtomicUsize>,
    // Dropping the watcher stops the watch.
    _watcher: Mutex<RecommendedWatcher>,
}

impl WatchedSetup {
    /// Parse `path` and start watching it.
    ///
    /// # Errors
    ///
    /// The initial parse fails or the watcher cannot be installed.
    pub fn watch(path: impl AsRef<Path>) -> Result<Self> {
        Self::watch_with(path, |_| {})
    }

    /// Like [`WatchedSetup::watch`], calling `on_reload` after each successful reload.
    ///
    /// # Errors
    ///
    /// The initial parse fails or the watcher cannot be installed.
    pub fn watch_with<F>(path: impl AsRef<Path>, on_reload: F) -> Result<Self>
    where
        F: Fn(&Setup) + Send + 'static,
    {
        let path = path.as_ref().to_path_buf();
        let initial = Setup::load_file(&path)?;
        let current = Arc::new(ArcSwap::from_pointee(initial));
        let reloads = Arc::new(AtomicUsize::new(0));

        let file_name: OsString = path
            .file_name()
            .map(OsString::from)
            .with_context(|| format!("setup path {} has no file name", path.display()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let swap = Arc::clone(&current);
        let counter = Arc::clone(&reloads);
        let reload_path = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if !relevant {
                        return;
                    }
                    // Truncate-then-write saves report an empty file first;
                    // only an empty file that stays empty is reloaded.
                    if is_empty_or_missing(&reload_path) {
                        std::thread::sleep(EMPTY_FILE_SETTLE);
                        if std::fs::metadata(&reload_path).is_err() {
                            debug!(path = %reload_path.display(), "hot-reload: setup file removed");
                            return;
                        }
                    }
                    match Setup::load_file(&reload_path) {
                        Ok(setup) => {
                            info!(
                                path = %reload_path.display(),
                                url_lines = setup.urls.as_ref().map_or(0, Vec::len),
                                "hot-reload: setup module reloaded"
                            );
                            on_reload(&setup);
                            swap.store(Arc::new(setup));
                            counter.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => error!(
                            path = %reload_path.display(),
                            error = %format!("{e:#}"),
                            "hot-reload: keeping previous setup"
                        ),
                    }
                }
                Err(e) => error!(error = %e, "hot-reload: watch error"),
            },
            Config::default(),
        )
        .context("failed to create setup watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;

        info!(path = %path.display(), "hot-reload: watching setup module");
        Ok(Self {
            path,
            current,
            reloads,
            _watcher: Mutex::new(watcher),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Successful reloads since the watch started.
    #[must_use]
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// The snapshot requests currently see.
    #[must_use]
    pub fn current(&self) -> Arc<Setup> {
        self.current.load_full()
    }
}

impl SetupSource for WatchedSetup {
    fn load(&self) -> Result<Arc<Setup>> {
        Ok(self.current())
    }
}

impl std::fmt::Debug for WatchedSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedSetup")
            .field("path", &self.path)
            .field("reloads", &self.reloads())
            .finish()
    }
}
