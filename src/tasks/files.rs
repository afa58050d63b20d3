use crate::config::Configuration;
use crate::error::Error;
use crate::scan::{self, PlaybackOrder, ScanOptions};
use crate::state::Slideshow;
use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, Sender};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Quiet period after a filesystem event before rescanning, so a burst of
/// events (a copy of many files) produces one rescan.
const WATCH_SETTLE: Duration = Duration::from_millis(250);

/// What the slideshow is built from: scan options plus display order.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub options: ScanOptions,
    pub order: PlaybackOrder,
    pub seed: u64,
}

impl Inventory {
    pub fn from_config(cfg: &Configuration) -> Self {
        Self {
            options: cfg.scan_options(),
            order: cfg.order,
            seed: cfg.shuffle_seed.unwrap_or_else(|| rand::rng().random()),
        }
    }

    /// Scan the library and return the images in display order.
    pub fn discover(&self) -> Result<Vec<PathBuf>, Error> {
        let mut images = scan::scan_images(&self.options)?;
        scan::arrange(&mut images, self.order, self.seed);
        Ok(images)
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Startup,
    Timer,
    Watch,
}

/// Keep the slideshow's image list in sync with the photo directory.
#[instrument(
    skip(cfg, slideshow, cancel),
    fields(root = %cfg.photo_library_path.display())
)]
pub async fn run(cfg: Configuration, slideshow: Slideshow, cancel: CancellationToken) -> Result<()> {
    let inventory = Arc::new(Inventory::from_config(&cfg));

    // 1) Startup scan
    refresh(&inventory, &slideshow, Trigger::Startup).await;

    // 2) Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<()>(16);
    let watcher = if cfg.watch {
        match start_watcher(&inventory.options, watch_tx) {
            Ok(w) => {
                info!("notify watcher initialized");
                Some(w)
            }
            Err(err) => {
                warn!(error = %err, "failed to start watcher; relying on periodic rescans");
                None
            }
        }
    } else {
        None
    };
    let watching = watcher.is_some();

    let mut ticker = interval(cfg.rescan_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the startup scan already covered it.
    ticker.tick().await;

    // 3) Event loop
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting files task");
                break;
            }

            _ = ticker.tick() => {
                refresh(&inventory, &slideshow, Trigger::Timer).await;
            }

            Some(()) = watch_rx.recv(), if watching => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("cancel received while settling; exiting files task");
                        break;
                    }
                    _ = tokio::time::sleep(WATCH_SETTLE) => {}
                }
                while watch_rx.try_recv().is_ok() {}
                refresh(&inventory, &slideshow, Trigger::Watch).await;
            }
        }
    }
    Ok(())
}

/// Rescan on the blocking pool and install the result. Scan failures keep
/// the previous list.
async fn refresh(inventory: &Arc<Inventory>, slideshow: &Slideshow, trigger: Trigger) {
    let job = Arc::clone(inventory);
    match tokio::task::spawn_blocking(move || job.discover()).await {
        Ok(Ok(images)) => {
            let count = images.len();
            if slideshow.replace_images(images) {
                info!(?trigger, count, "image list updated");
            } else {
                debug!(?trigger, count, "rescan found no changes");
            }
        }
        Ok(Err(err)) => {
            warn!(?trigger, error = %err, "rescan failed; keeping previous image list");
        }
        Err(err) => error!(?trigger, "rescan worker failed: {err}"),
    }
}

fn start_watcher(options: &ScanOptions, tx: Sender<()>) -> notify::Result<RecommendedWatcher> {
    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            debug!(kind = ?event.kind, paths = ?event.paths, "notify event");
            // A full channel already has a rescan pending.
            let _ = tx.try_send(());
        }
        Err(err) => error!("watch error: {err}"),
    })?;

    let mode = if options.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher.watch(&options.root, mode)?;
    Ok(watcher)
}
