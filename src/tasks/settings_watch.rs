use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc::{self, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{AppConfig, SceneSettings};
use crate::scan::fill_assets;

/// Loads the scene section of the config file at `path`, filling an empty
/// asset list from the library directory.
pub fn load_scene(path: &Path, library_override: Option<&Path>) -> Result<SceneSettings> {
    let cfg = AppConfig::from_yaml_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?
        .validated()
        .context("invalid configuration values")?;
    let library = library_override.or(cfg.library.as_deref());
    let mut scene = cfg.scene;
    fill_assets(&mut scene, library)?;
    Ok(scene)
}

/// Watches the config file and forwards every changed scene to the frame loop.
///
/// Edits that fail to parse or validate are logged and skipped; the previous
/// scene stays in effect.
#[instrument(skip_all, fields(config = %config_path.display()))]
pub async fn run(
    config_path: PathBuf,
    library_override: Option<PathBuf>,
    initial: SceneSettings,
    to_frames: Sender<SceneSettings>,
    cancel: CancellationToken,
) -> Result<()> {
    let config_path = config_path
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", config_path.display()))?;
    let dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(watching = %dir.display(), "settings watcher initialized");

    let mut last = initial;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting settings task");
                break;
            }
            Some(res) = watch_rx.recv() => match res {
                Ok(event) => {
                    if !is_edit(&event.kind) || !touches(&event, &config_path) {
                        continue;
                    }
                    debug!(kind = ?event.kind, "config file changed");
                    match load_scene(&config_path, library_override.as_deref()) {
                        Ok(scene) if scene == last => debug!("scene unchanged"),
                        Ok(scene) => {
                            info!(assets = scene.assets.len(), "scene settings reloaded");
                            last = scene.clone();
                            if to_frames.send(scene).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!("ignoring config change: {err:#}"),
                    }
                }
                Err(err) => error!("watch error: {err}"),
            }
        }
    }
    Ok(())
}

fn is_edit(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn touches(event: &Event, config_path: &Path) -> bool {
    let name = config_path.file_name();
    event.paths.iter().any(|p| p.file_name() == name)
}
