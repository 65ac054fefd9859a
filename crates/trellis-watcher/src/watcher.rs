//! Filesystem watcher implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use trellis_core::{Module, ModuleId};
use trellis_workspace::{DocumentParser, WorkspaceManager};

/// Events emitted by the file watcher
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// Document created
    Created(PathBuf),
    /// Document modified
    Modified(PathBuf),
    /// Document removed
    Removed(PathBuf),
}

/// File system watcher for monitoring machine documents
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    watched_paths: HashSet<PathBuf>,
    root_path: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher for the given root path, reacting only to
    /// paths matching the configured glob patterns.
    pub fn new(root_path: impl AsRef<Path>, watch_globs: &[String]) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        let filter = build_glob_set(watch_globs)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let event_tx_clone = event_tx.clone();
        let watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        debug!("File system event: {:?}", event);
                        Self::handle_notify_event(event, &filter, &event_tx_clone);
                    }
                    Err(e) => {
                        error!("File system watch error: {}", e);
                    }
                }
            })?;

        Ok(Self {
            watcher,
            event_rx,
            watched_paths: HashSet::new(),
            root_path,
        })
    }

    /// Convert a notify event into watch events, dropping ignored paths
    fn handle_notify_event(
        event: notify::Event,
        filter: &GlobSet,
        event_tx: &mpsc::UnboundedSender<WatchEvent>,
    ) {
        let wrap: Option<fn(PathBuf) -> WatchEvent> = match event.kind {
            notify::EventKind::Create(_) => Some(WatchEvent::Created),
            notify::EventKind::Modify(_) => Some(WatchEvent::Modified),
            notify::EventKind::Remove(_) => Some(WatchEvent::Removed),
            _ => None,
        };
        let Some(wrap) = wrap else {
            return;
        };
        for path in event.paths {
            if should_ignore_path(&path) || !matches_documents(filter, &path) {
                continue;
            }
            if let Err(e) = event_tx.send(wrap(path)) {
                warn!("Failed to send watch event: {}", e);
            }
        }
    }

    /// Watch a directory recursively
    pub fn watch_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Watching directory: {:?}", path);

        self.watcher.watch(path, RecursiveMode::Recursive)?;
        self.watched_paths.insert(path.to_path_buf());
        Ok(())
    }

    /// Watch a single file
    pub fn watch_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Watching file: {:?}", path);

        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        self.watched_paths.insert(path.to_path_buf());
        Ok(())
    }

    /// Stop watching a path
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Stopping watch for: {:?}", path);

        self.watcher.unwatch(path)?;
        self.watched_paths.remove(path);
        Ok(())
    }

    /// Get the event receiver
    pub fn event_receiver(&mut self) -> &mut mpsc::UnboundedReceiver<WatchEvent> {
        &mut self.event_rx
    }

    /// Check if a path is being watched
    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched_paths.contains(path)
    }

    /// Get all watched paths
    pub fn watched_paths(&self) -> &HashSet<PathBuf> {
        &self.watched_paths
    }
}

/// Watcher service that applies filesystem changes to the workspace as
/// incremental add/update/remove operations, serialized through one task.
pub struct WatcherService {
    watcher: Arc<RwLock<FileWatcher>>,
    workspace: Arc<RwLock<WorkspaceManager>>,
    parser: Arc<dyn DocumentParser>,
}

impl WatcherService {
    /// Create a new watcher service
    pub fn new(
        root_path: impl AsRef<Path>,
        watch_globs: &[String],
        workspace: Arc<RwLock<WorkspaceManager>>,
        parser: Arc<dyn DocumentParser>,
    ) -> Result<Self> {
        let watcher = Arc::new(RwLock::new(FileWatcher::new(root_path, watch_globs)?));
        Ok(Self {
            watcher,
            workspace,
            parser,
        })
    }

    /// Start watching the workspace root
    pub async fn start_watching(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let root_path = watcher.root_path.clone();

        watcher.watch_directory(&root_path)?;

        info!("Started watching workspace: {:?}", root_path);
        Ok(())
    }

    /// Process file system events and update the workspace
    pub async fn process_events(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let event_rx = watcher.event_receiver();

        while let Some(event) = event_rx.recv().await {
            debug!("Processing watch event: {:?}", event);

            match event {
                WatchEvent::Created(path) | WatchEvent::Modified(path) => {
                    self.handle_document_change(&path).await?;
                }
                WatchEvent::Removed(path) => {
                    self.handle_document_removal(&path).await?;
                }
            }
        }

        Ok(())
    }

    /// Re-load one changed document; its module is replaced wholesale
    async fn handle_document_change(&self, path: &Path) -> Result<()> {
        info!("Processing document change: {:?}", path);

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to read document {}: {}", path.display(), e);
                return Ok(());
            }
        };

        let id = ModuleId::from_path(path);
        let ast = match self.parser.parse(&id, &content) {
            Ok(ast) => ast,
            Err(e) => {
                // keep the previous module until the document parses again
                warn!("Document {} no longer parses: {}", path.display(), e);
                return Ok(());
            }
        };

        let mut workspace = self.workspace.write().await;
        workspace
            .update_document(Module::new(id.clone(), ast, content))
            .await;
        info!("Updated document {id}");

        Ok(())
    }

    /// Retract one removed document from the workspace
    async fn handle_document_removal(&self, path: &Path) -> Result<()> {
        info!("Processing document removal: {:?}", path);

        let id = ModuleId::from_path(path);
        let mut workspace = self.workspace.write().await;
        if workspace.remove_document(&id) {
            info!("Removed document {id}");
        }

        Ok(())
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Match against the file name as well as the full path, so `**/*.fsm`
/// style patterns behave the same for absolute event paths.
fn matches_documents(filter: &GlobSet, path: &Path) -> bool {
    if filter.is_match(path) {
        return true;
    }
    path.file_name().is_some_and(|name| filter.is_match(name))
}

/// Check if a path should be ignored (e.g. build output, VCS metadata)
fn should_ignore_path(path: &Path) -> bool {
    for component in path.components() {
        if let Some(name) = component.as_os_str().to_str() {
            if name == "target" || name == ".git" || name == ".trellis" {
                return true;
            }
        }
    }
    false
}
