// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hot reload: filesystem events on the plugins root become load, reload
//! and unload calls.
//!
//! The OS watcher callback only classifies events and pushes them onto a
//! bounded channel. A single [`Reconciler`] task drains the channel, waits
//! out the debounce window for the event kind, and acts through
//! [`PluginActions`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use galaxy_core::{GalaxyError, PluginId, parse_folder_id};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::manifest::{MANIFEST_FILE, load_manifest};

/// The operations the reconciler drives.
#[async_trait]
pub trait PluginActions: Send + Sync {
    async fn reload(&self, id: PluginId) -> Result<(), GalaxyError>;
    async fn load_folder(&self, folder: &Path) -> Result<(), GalaxyError>;
    async fn unload(&self, id: PluginId) -> Result<(), GalaxyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Write,
    Create,
    Remove,
    Rename,
}

/// A filtered filesystem event on a manifest or binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct WatcherSettings {
    pub write_debounce: Duration,
    pub create_settle: Duration,
    pub queue_capacity: usize,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            write_debounce: Duration::from_millis(100),
            create_settle: Duration::from_millis(500),
            queue_capacity: 256,
        }
    }
}

/// Whether `path` is a file the watcher cares about.
pub fn is_watched_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == MANIFEST_FILE)
        || path.extension().is_some_and(|ext| ext == "wasm")
}

/// Translate a raw notify event into watch events.
pub fn classify(event: &Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchKind::Create,
        EventKind::Modify(ModifyKind::Name(_)) => WatchKind::Rename,
        EventKind::Modify(_) => WatchKind::Write,
        EventKind::Remove(_) => WatchKind::Remove,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .filter(|path| is_watched_file(path))
        .map(|path| WatchEvent {
            kind,
            path: path.clone(),
        })
        .collect()
}

/// The `<name>-<id>` folder directly under `root` that contains `path`.
pub fn plugin_folder(root: &Path, path: &Path) -> Option<(PathBuf, PluginId)> {
    let folder = path.parent()?;
    if folder.parent()? != root {
        return None;
    }
    let id = parse_folder_id(folder.file_name()?.to_str()?)?;
    Some((folder.to_path_buf(), id))
}

/// Start the OS watcher on `root`, forwarding events to `tx`.
///
/// The returned watcher stops when dropped. A full queue drops the event.
pub fn watch_plugins(
    root: &Path,
    tx: mpsc::Sender<WatchEvent>,
) -> Result<RecommendedWatcher, GalaxyError> {
    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) => {
                for watch_event in classify(&event) {
                    if let Err(e) = tx.try_send(watch_event) {
                        warn!(error = %e, "plugin watch queue full or closed, dropping event");
                    }
                }
            }
            Err(e) => warn!(error = %e, "plugin watcher error"),
        },
        Config::default(),
    )
    .map_err(|e| GalaxyError::Internal(format!("failed to create plugin watcher: {e}")))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| {
            GalaxyError::Internal(format!("failed to watch {}: {e}", root.display()))
        })?;
    info!(root = %root.display(), "watching plugins directory");
    Ok(watcher)
}

/// Single consumer of watch events.
pub struct Reconciler<A: ?Sized> {
    root: PathBuf,
    actions: Arc<A>,
    settings: WatcherSettings,
    rx: mpsc::Receiver<WatchEvent>,
    cancel: CancellationToken,
}

impl<A: PluginActions + ?Sized> Reconciler<A> {
    pub fn new(
        root: impl Into<PathBuf>,
        actions: Arc<A>,
        settings: WatcherSettings,
        rx: mpsc::Receiver<WatchEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            root: root.into(),
            actions,
            settings,
            rx,
            cancel,
        }
    }

    /// Process events until cancelled or the channel closes.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("plugin reconciler cancelled");
                    break;
                }
                event = self.rx.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }
        }
        info!("plugin reconciler stopped");
    }

    async fn handle(&self, event: WatchEvent) {
        let Some((folder, id)) = plugin_folder(&self.root, &event.path) else {
            warn!(path = %event.path.display(), "change outside a plugin folder, ignoring");
            return;
        };
        debug!(plugin_id = %id, kind = ?event.kind, path = %event.path.display(), "plugin file changed");

        let result = match event.kind {
            WatchKind::Write => {
                tokio::time::sleep(self.settings.write_debounce).await;
                self.actions.reload(id).await
            }
            WatchKind::Create => {
                tokio::time::sleep(self.settings.create_settle).await;
                if !plugin_files_present(&folder) {
                    debug!(plugin_id = %id, "plugin files incomplete, waiting for more changes");
                    return;
                }
                self.actions.load_folder(&folder).await
            }
            WatchKind::Remove | WatchKind::Rename => self.actions.unload(id).await,
        };

        if let Err(e) = result {
            warn!(plugin_id = %id, kind = ?event.kind, error = %e, "hot reload action failed");
        }
    }
}

fn plugin_files_present(folder: &Path) -> bool {
    match load_manifest(&folder.join(MANIFEST_FILE)) {
        Ok(manifest) => folder.join(manifest.wasm_file_name()).is_file(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Reload(PluginId),
        Load(PathBuf),
        Unload(PluginId),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Call, tokio::time::Instant)>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
        }

        fn record(&self, call: Call) {
            self.calls
                .lock()
                .unwrap()
                .push((call, tokio::time::Instant::now()));
        }
    }

    #[async_trait]
    impl PluginActions for Recorder {
        async fn reload(&self, id: PluginId) -> Result<(), GalaxyError> {
            self.record(Call::Reload(id));
            Ok(())
        }
        async fn load_folder(&self, folder: &Path) -> Result<(), GalaxyError> {
            self.record(Call::Load(folder.to_path_buf()));
            Ok(())
        }
        async fn unload(&self, id: PluginId) -> Result<(), GalaxyError> {
            self.record(Call::Unload(id));
            Err(GalaxyError::PluginNotFound(id))
        }
    }

    fn start(root: &Path) -> (Arc<Recorder>, mpsc::Sender<WatchEvent>, CancellationToken, tokio::task::JoinHandle<()>) {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let reconciler = Reconciler::new(
            root,
            Arc::clone(&recorder),
            WatcherSettings::default(),
            rx,
            cancel.clone(),
        );
        let handle = tokio::spawn(reconciler.run());
        (recorder, tx, cancel, handle)
    }

    #[test]
    fn classify_filters_and_maps_kinds() {
        let wasm = PathBuf::from("/plugins/demo-1/demo.wasm");
        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(wasm.clone())
            .add_path(PathBuf::from("/plugins/demo-1/README.md"));
        assert_eq!(
            classify(&event),
            vec![WatchEvent {
                kind: WatchKind::Write,
                path: wasm.clone()
            }]
        );

        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/plugins/demo-1/plugin.yml"));
        assert_eq!(classify(&created)[0].kind, WatchKind::Create);

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(wasm.clone());
        assert_eq!(classify(&removed)[0].kind, WatchKind::Remove);

        let renamed =
            Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From))).add_path(wasm);
        assert_eq!(classify(&renamed)[0].kind, WatchKind::Rename);

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/plugins/demo-1/demo.wasm"));
        assert!(classify(&access).is_empty());
    }

    #[test]
    fn plugin_folder_requires_direct_child_with_id() {
        let root = Path::new("/plugins");
        assert_eq!(
            plugin_folder(root, Path::new("/plugins/demo-12/demo.wasm")),
            Some((PathBuf::from("/plugins/demo-12"), PluginId(12)))
        );
        assert_eq!(plugin_folder(root, Path::new("/plugins/demo/demo.wasm")), None);
        assert_eq!(plugin_folder(root, Path::new("/plugins/demo.wasm")), None);
        assert_eq!(
            plugin_folder(root, Path::new("/plugins/demo-1/nested/demo.wasm")),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn write_reloads_after_debounce() {
        let root = PathBuf::from("/plugins");
        let (recorder, tx, cancel, handle) = start(&root);
        let started = tokio::time::Instant::now();

        tx.send(WatchEvent {
            kind: WatchKind::Write,
            path: root.join("demo-3/demo.wasm"),
        })
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(recorder.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(recorder.calls(), vec![Call::Reload(PluginId(3))]);
        let at = recorder.calls.lock().unwrap()[0].1;
        assert!(at - started >= Duration::from_millis(100));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn remove_unloads_immediately_and_errors_are_logged() {
        let root = PathBuf::from("/plugins");
        let (recorder, tx, _cancel, handle) = start(&root);

        tx.send(WatchEvent {
            kind: WatchKind::Remove,
            path: root.join("demo-9/demo.wasm"),
        })
        .await
        .unwrap();
        tx.send(WatchEvent {
            kind: WatchKind::Rename,
            path: root.join("demo-9/plugin.yml"),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(
            recorder.calls(),
            vec![Call::Unload(PluginId(9)), Call::Unload(PluginId(9))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn create_waits_for_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("hello-5");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(
            folder.join(MANIFEST_FILE),
            "metadata:\n  name: hello\n  version: 1.0.0\n  author: a\n",
        )
        .unwrap();

        let (recorder, tx, _cancel, handle) = start(dir.path());
        tx.send(WatchEvent {
            kind: WatchKind::Create,
            path: folder.join(MANIFEST_FILE),
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(recorder.calls().is_empty());

        std::fs::write(folder.join("hello.wasm"), b"\0asm").unwrap();
        tx.send(WatchEvent {
            kind: WatchKind::Create,
            path: folder.join("hello.wasm"),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(recorder.calls(), vec![Call::Load(folder)]);
    }

    #[tokio::test(start_paused = true)]
    async fn events_outside_plugin_folders_are_ignored() {
        let root = PathBuf::from("/plugins");
        let (recorder, tx, _cancel, handle) = start(&root);
        tx.send(WatchEvent {
            kind: WatchKind::Remove,
            path: root.join("loose.wasm"),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
        assert!(recorder.calls().is_empty());
    }
}
