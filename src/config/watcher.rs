//! Hot reload of the mediator configuration file.
//!
//! # Design Decisions
//! - Watches the parent directory so editors that save by rename still
//!   trigger a reload; events for other files are ignored
//! - Only snapshots that differ from the last one sent are forwarded
//! - A file that fails to load or validate keeps the current snapshot

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::MediatorConfig;

/// Forwards reloaded configuration snapshots to the router owner.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<MediatorConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded snapshots.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<MediatorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Seed with the current file so an unchanged save is not forwarded.
        let last = Mutex::new(load_config(&path).ok());
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &watched) => {
                    reload(&watched, &last, &update_tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(
    path: &Path,
    last: &Mutex<Option<MediatorConfig>>,
    update_tx: &mpsc::UnboundedSender<MediatorConfig>,
) {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            return;
        }
    };

    let mut last = last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if last.as_ref() == Some(&config) {
        tracing::debug!(path = ?path, "Config file touched without changes");
        return;
    }

    tracing::info!(path = ?path, offline = config.offline, "Config file changed, reloading");
    *last = Some(config.clone());
    let _ = update_tx.send(config);
}

/// True when `event` writes, creates or renames onto the watched file.
fn touches(event: &Event, watched: &Path) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_)
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == watched.file_name())
}
