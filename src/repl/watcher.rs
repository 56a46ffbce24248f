use crate::sources::FeedFormat;
use crossbeam_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Watches feed files and reports which ones changed.
///
/// The parent directory is watched rather than the file, so editors that
/// save by renaming a temp file over the original keep triggering reloads.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    files: HashMap<PathBuf, FeedFormat>,
}

impl FileWatcher {
    /// Create a new file watcher that sends events to the provided channel
    pub fn new(tx: Sender<notify::Result<Event>>) -> notify::Result<Self> {
        let watcher = notify::recommended_watcher(move |res| {
            // Receiver gone means the REPL is shutting down
            let _ = tx.send(res);
        })?;

        Ok(Self {
            watcher,
            files: HashMap::new(),
        })
    }

    /// Start watching `path`, returning its canonical form
    pub fn watch(&mut self, path: &Path, format: FeedFormat) -> notify::Result<PathBuf> {
        let path = path.canonicalize().map_err(notify::Error::io)?;
        let dir = path
            .parent()
            .ok_or_else(|| notify::Error::io(io::Error::other("file has no parent directory")))?;
        let dir_already_watched = self.files.keys().any(|f| f.parent() == Some(dir));
        if !dir_already_watched {
            self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
        self.files.insert(path.clone(), format);
        Ok(path)
    }

    pub fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        let path = path.canonicalize().map_err(notify::Error::io)?;
        if self.files.remove(&path).is_none() {
            return Ok(());
        }
        if let Some(dir) = path.parent() {
            if !self.files.keys().any(|f| f.parent() == Some(dir)) {
                self.watcher.unwatch(dir)?;
            }
        }
        Ok(())
    }

    /// Stop watching every file
    pub fn clear(&mut self) {
        let dirs: HashSet<PathBuf> = self
            .files
            .drain()
            .filter_map(|(file, _)| file.parent().map(Path::to_path_buf))
            .collect();
        for dir in dirs {
            if let Err(e) = self.watcher.unwatch(&dir) {
                debug!(dir = %dir.display(), "unwatch failed: {}", e);
            }
        }
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        path.canonicalize()
            .map(|p| self.files.contains_key(&p))
            .unwrap_or(false)
    }

    /// Watched files touched by a write or create event, deduplicated
    pub fn changed(&self, event: &Event) -> Vec<(PathBuf, FeedFormat)> {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return Vec::new();
        }
        let mut changed: Vec<(PathBuf, FeedFormat)> = Vec::new();
        for path in &event.paths {
            let path = path.canonicalize().unwrap_or_else(|_| path.clone());
            if let Some(format) = self.files.get(&path) {
                if !changed.iter().any(|(p, _)| *p == path) {
                    changed.push((path, *format));
                }
            }
        }
        changed
    }
}
