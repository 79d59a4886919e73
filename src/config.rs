use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::processing::color::parse_hex_rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    #[default]
    Crossfade,
    Slide,
    KenBurns,
}

impl TransitionKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Crossfade => "crossfade",
            Self::Slide => "slide",
            Self::KenBurns => "ken-burns",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    #[default]
    Cover,
    Contain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    Static,
    Left,
    Right,
    Up,
    Down,
    OscillateHorizontal,
    OscillateVertical,
    Orbit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Modulation {
    #[default]
    Constant,
    Pulse,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ZoomSettings {
    /// Zoom multiplier applied on top of the fit scale.
    pub base: f32,
    pub mode: Modulation,
    /// Pulse angular rate in radians per second.
    pub pulse_rate: f32,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            base: 1.0,
            mode: Modulation::Constant,
            pulse_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct OverlaySettings {
    /// Hex color (`#rgb` or `#rrggbb`).
    pub color: String,
    pub opacity: f32,
    pub mode: Modulation,
    /// Pulse angular rate in radians per second.
    pub pulse_rate: f32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            color: String::from("#000000"),
            opacity: 0.0,
            mode: Modulation::Constant,
            pulse_rate: 0.5,
        }
    }
}

/// Scene configuration delivered by the host whenever a control changes.
///
/// The engine treats this as an immutable value: every delivery replaces the
/// previous one wholesale and the engine derives its own state from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SceneSettings {
    /// Ordered asset URLs (plain paths or `file://` URLs).
    pub assets: Vec<String>,
    pub transition: TransitionKind,
    pub fit: FitMode,
    pub direction: Direction,
    /// Pan speed in pixels per second.
    pub pan_speed: f32,
    /// Time an asset stays fully visible before a transition starts.
    #[serde(with = "humantime_serde")]
    pub hold: Duration,
    #[serde(with = "humantime_serde")]
    pub transition_duration: Duration,
    pub zoom: ZoomSettings,
    pub overlay: OverlaySettings,
    /// Visit assets in a shuffled order instead of list order.
    pub shuffle: bool,
    /// Incremented by the host to request a fresh shuffle of the same assets.
    pub shuffle_trigger: u64,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            transition: TransitionKind::default(),
            fit: FitMode::default(),
            direction: Direction::default(),
            pan_speed: 20.0,
            hold: Duration::from_secs(5),
            transition_duration: Duration::from_secs(1),
            zoom: ZoomSettings::default(),
            overlay: OverlaySettings::default(),
            shuffle: false,
            shuffle_trigger: 0,
        }
    }
}

/// Options fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EngineOptions {
    /// Upper bound for a single tick's time step.
    #[serde(with = "humantime_serde")]
    pub max_frame_delta: Duration,
    /// Number of background decode threads; zero decodes on the calling thread.
    pub decode_workers: usize,
    /// Decoded assets larger than this on either side are downscaled.
    pub asset_max_dim: u32,
    /// Optional deterministic seed for shuffled playback.
    pub shuffle_seed: Option<u64>,
    /// Color drawn behind the assets and while nothing is ready.
    pub background: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_frame_delta: Duration::from_millis(50),
            decode_workers: 2,
            asset_max_dim: 4096,
            shuffle_seed: None,
            background: String::from("#000000"),
        }
    }
}

impl EngineOptions {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_frame_delta > Duration::ZERO,
            "engine.max-frame-delta must be positive"
        );
        ensure!(
            self.asset_max_dim > 0,
            "engine.asset-max-dim must be greater than zero"
        );
        ensure!(
            self.asset_max_dim <= u32::from(u16::MAX),
            "engine.asset-max-dim must not exceed {}",
            u16::MAX
        );
        ensure!(
            parse_hex_rgb(&self.background).is_some(),
            "engine.background '{}' is not a #rgb or #rrggbb color",
            self.background
        );
        Ok(())
    }

    pub(crate) fn background_rgb(&self) -> [u8; 3] {
        parse_hex_rgb(&self.background).unwrap_or([0, 0, 0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Configuration file consumed by the `backdrop` host binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AppConfig {
    pub viewport: Viewport,
    /// Target frames per second for the host tick loop.
    pub frame_rate: u32,
    /// Directory scanned for images when `scene.assets` is empty.
    pub library: Option<PathBuf>,
    /// Where periodic PNG snapshots of the surface are written.
    pub snapshot_dir: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub snapshot_every: Duration,
    pub engine: EngineOptions,
    pub scene: SceneSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            frame_rate: 60,
            library: None,
            snapshot_dir: None,
            snapshot_every: Duration::from_secs(1),
            engine: EngineOptions::default(),
            scene: SceneSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.viewport.width > 0 && self.viewport.height > 0,
            "viewport width and height must be greater than zero"
        );
        ensure!(
            self.viewport.width <= u32::from(u16::MAX) && self.viewport.height <= u32::from(u16::MAX),
            "viewport width and height must not exceed {}",
            u16::MAX
        );
        ensure!(
            (1..=240).contains(&self.frame_rate),
            "frame-rate must be between 1 and 240"
        );
        ensure!(
            self.snapshot_every > Duration::ZERO,
            "snapshot-every must be positive"
        );
        self.engine
            .validate()
            .context("invalid engine configuration")?;
        Ok(self)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}
