use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, SceneSettings};
use crate::engine::Engine;
use crate::events::{ControlCommand, Transport};
use crate::render::surface::Surface;

/// Host frame loop: owns the engine and surface, folds settings and control
/// input into engine deliveries, and ticks at the configured frame rate.
///
/// With `max_frames` set the loop stops after that many frames and cancels
/// the other tasks.
pub async fn run(
    cfg: AppConfig,
    scene: SceneSettings,
    mut settings_rx: Receiver<SceneSettings>,
    mut control_rx: Receiver<ControlCommand>,
    cancel: CancellationToken,
    max_frames: Option<u64>,
) -> Result<()> {
    let (width, height) = (cfg.viewport.width, cfg.viewport.height);
    let mut engine = Engine::with_file_decoder(&cfg.engine, width, height);
    let mut surface = Surface::new(width, height);
    if let Some(dir) = &cfg.snapshot_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot dir {}", dir.display()))?;
    }

    let mut source = scene;
    let mut shuffles: u64 = 0;
    let mut scene = effective(&source, shuffles);
    let mut transport = Transport::default();
    engine.sync(&scene, &transport);
    info!(assets = scene.assets.len(), width, height, "frame loop started");

    let mut ticker = interval(cfg.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();
    let mut last_snapshot: Option<Instant> = None;
    let mut last_status = String::new();
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting frame loop");
                break;
            }
            Some(next) = settings_rx.recv() => {
                source = next;
                scene = effective(&source, shuffles);
                engine.sync(&scene, &transport);
            }
            Some(cmd) = control_rx.recv() => {
                if transport.apply(cmd) {
                    shuffles = shuffles.wrapping_add(1);
                    scene = effective(&source, shuffles);
                }
                engine.sync(&scene, &transport);
            }
            now = ticker.tick() => {
                let dt = now.saturating_duration_since(last_tick);
                last_tick = now;
                engine.sync(&scene, &transport);
                engine.tick(dt);
                engine.render(&mut surface);
                frames += 1;

                let status = engine.status().to_string();
                if status != last_status {
                    info!(%status, "engine status");
                    last_status = status;
                }

                if let Some(dir) = &cfg.snapshot_dir {
                    let due = last_snapshot
                        .is_none_or(|at| now.saturating_duration_since(at) >= cfg.snapshot_every);
                    if due {
                        last_snapshot = Some(now);
                        write_snapshot(&surface, dir, frames);
                    }
                }

                if max_frames.is_some_and(|max| frames >= max) {
                    info!(frames, "frame limit reached");
                    cancel.cancel();
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Scene as delivered to the engine: the file's trigger plus local shuffle requests.
fn effective(source: &SceneSettings, shuffles: u64) -> SceneSettings {
    let mut scene = source.clone();
    scene.shuffle_trigger = source.shuffle_trigger.wrapping_add(shuffles);
    scene
}

fn write_snapshot(surface: &Surface, dir: &Path, frame: u64) {
    let path: PathBuf = dir.join(format!("frame-{frame:06}.png"));
    match surface.save_png(&path) {
        Ok(()) => debug!(path = %path.display(), "snapshot written"),
        Err(err) => warn!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    #[test]
    fn local_shuffles_offset_the_file_trigger() {
        let source = SceneSettings {
            shuffle_trigger: 4,
            ..SceneSettings::default()
        };
        assert_eq!(effective(&source, 0).shuffle_trigger, 4);
        assert_eq!(effective(&source, 2).shuffle_trigger, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bounded_run_writes_snapshots() {
        let tmp = tempdir().unwrap();
        let photo = tmp.path().join("red.png");
        RgbaImage::from_pixel(8, 4, Rgba([255, 0, 0, 255]))
            .save(&photo)
            .unwrap();
        let snapshots = tmp.path().join("snaps");

        let mut cfg = AppConfig {
            frame_rate: 120,
            snapshot_dir: Some(snapshots.clone()),
            ..AppConfig::default()
        };
        cfg.viewport.width = 16;
        cfg.viewport.height = 16;
        cfg.engine.decode_workers = 0;
        let scene = SceneSettings {
            assets: vec![photo.to_string_lossy().into_owned()],
            ..SceneSettings::default()
        };

        let (_settings_tx, settings_rx) = mpsc::channel(1);
        let (_control_tx, control_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        run(cfg, scene, settings_rx, control_rx, cancel.clone(), Some(3))
            .await
            .unwrap();

        assert!(cancel.is_cancelled());
        let first = image::open(snapshots.join("frame-000001.png")).unwrap().to_rgba8();
        assert_eq!(first.dimensions(), (16, 16));
        assert!(fs::read_dir(&snapshots).unwrap().count() >= 1);
    }
}
