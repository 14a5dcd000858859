//! Hot reload of the configuration file.
//!
//! The parent directory is watched rather than the file itself, so saves that
//! replace the file (write to a temp file, then rename) are still seen. A
//! reload is forwarded only when it parses, validates, and differs from the
//! last configuration forwarded; editors often emit several events per save.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::BalancerConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct ConfigWatcher {
    path: PathBuf,
    last: BalancerConfig,
    update_tx: mpsc::UnboundedSender<BalancerConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration already running; identical reloads are dropped.
    pub fn new(
        path: &Path,
        current: BalancerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<BalancerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            last: current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut last,
            update_tx,
        } = self;
        let dir = watch_dir(&path);
        let file_name = path.file_name().map(OsString::from);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, file_name.as_deref()) => {
                    if let Some(config) = reload(&path, &mut last) {
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// A create or modify event naming the watched file.
fn touches(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == file_name)
}

/// Load `path`; `Some` only for a valid configuration different from `last`.
fn reload(path: &Path, last: &mut BalancerConfig) -> Option<BalancerConfig> {
    match load_config(path) {
        Ok(config) if config == *last => {
            tracing::debug!(path = %path.display(), "Config unchanged, reload skipped");
            None
        }
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config file reloaded");
            *last = config.clone();
            Some(config)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}
