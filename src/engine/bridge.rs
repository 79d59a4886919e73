//! Reconciles externally delivered scene settings and transport signals with
//! the running engine.

use tracing::warn;

use crate::config::{Direction, FitMode, Modulation, SceneSettings, TransitionKind};
use crate::engine::transition::Timing;
use crate::events::{StepDirection, Transport};
use crate::processing::color::{parse_hex_rgb, to_hex};

const MAX_PAN_SPEED: f32 = 4000.0;
const MAX_ZOOM_BASE: f32 = 4.0;
const MAX_PULSE_RATE: f32 = 20.0;
const MIN_TRANSITION_SECS: f64 = 0.001;
const MAX_HOLD_SECS: f64 = 24.0 * 60.0 * 60.0;
const FALLBACK_COLOR: [u8; 3] = [0, 0, 0];

/// Sanitized copy of the scene settings read by the per-frame code.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSettings {
    pub transition: TransitionKind,
    pub fit: FitMode,
    pub direction: Direction,
    pub pan_speed: f64,
    pub hold: f64,
    pub transition_secs: f64,
    pub zoom_base: f64,
    pub zoom_mode: Modulation,
    pub zoom_rate: f64,
    pub overlay_color: [u8; 3],
    pub overlay_opacity: f32,
    pub overlay_mode: Modulation,
    pub overlay_rate: f64,
    pub shuffle: bool,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::sanitize(&SceneSettings::default())
    }
}

impl LiveSettings {
    /// Replaces non-finite values with defaults and clamps everything else into
    /// the ranges the frame code can handle. An unparsable overlay color becomes black.
    pub fn sanitize(settings: &SceneSettings) -> Self {
        let d = SceneSettings::default();
        let s = settings;
        Self {
            transition: s.transition,
            fit: s.fit,
            direction: s.direction,
            pan_speed: f64::from(finite_or(s.pan_speed, d.pan_speed).clamp(0.0, MAX_PAN_SPEED)),
            hold: s.hold.as_secs_f64().min(MAX_HOLD_SECS),
            transition_secs: s.transition_duration.as_secs_f64().max(MIN_TRANSITION_SECS),
            zoom_base: f64::from(finite_or(s.zoom.base, d.zoom.base).clamp(1.0, MAX_ZOOM_BASE)),
            zoom_mode: s.zoom.mode,
            zoom_rate: pulse_rate(s.zoom.pulse_rate, d.zoom.pulse_rate),
            overlay_color: parse_hex_rgb(&s.overlay.color).unwrap_or(FALLBACK_COLOR),
            overlay_opacity: finite_or(s.overlay.opacity, d.overlay.opacity).clamp(0.0, 1.0),
            overlay_mode: s.overlay.mode,
            overlay_rate: pulse_rate(s.overlay.pulse_rate, d.overlay.pulse_rate),
            shuffle: s.shuffle,
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            hold: self.hold,
            transition: self.transition_secs,
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn pulse_rate(value: f32, fallback: f32) -> f64 {
    f64::from(finite_or(value, fallback).clamp(0.0, MAX_PULSE_RATE))
}

/// What the engine must do for one delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    /// Drop every slot and decode the asset list again.
    pub reload: bool,
    /// Rebuild the playback order over the already loaded assets.
    pub reshuffle: bool,
    pub step: Option<StepDirection>,
    pub settings: LiveSettings,
    pub running: bool,
    pub auto_advance: bool,
}

#[derive(Debug, Clone)]
struct Delivered {
    assets: Vec<String>,
    shuffle: bool,
    shuffle_trigger: u64,
    reset_seq: u64,
    step_seq: u64,
}

/// Remembers the previous delivery and turns the next one into a [`SyncPlan`].
#[derive(Debug, Default)]
pub struct SyncBridge {
    last: Option<Delivered>,
    warned_color: Option<String>,
}

impl SyncBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&mut self, settings: &SceneSettings, transport: &Transport) -> SyncPlan {
        let (reload, reshuffle, step) = match &self.last {
            None => (true, false, None),
            Some(last) => {
                let reload =
                    last.assets != settings.assets || last.reset_seq != transport.reset_seq;
                let reshuffle = !reload
                    && (last.shuffle_trigger != settings.shuffle_trigger
                        || last.shuffle != settings.shuffle);
                let step = (last.step_seq != transport.step_seq).then_some(transport.step);
                (reload, reshuffle, step)
            }
        };

        match &mut self.last {
            Some(last) => {
                if last.assets != settings.assets {
                    last.assets.clone_from(&settings.assets);
                }
                last.shuffle = settings.shuffle;
                last.shuffle_trigger = settings.shuffle_trigger;
                last.reset_seq = transport.reset_seq;
                last.step_seq = transport.step_seq;
            }
            None => {
                self.last = Some(Delivered {
                    assets: settings.assets.clone(),
                    shuffle: settings.shuffle,
                    shuffle_trigger: settings.shuffle_trigger,
                    reset_seq: transport.reset_seq,
                    step_seq: transport.step_seq,
                });
            }
        }

        self.check_color(&settings.overlay.color);

        SyncPlan {
            reload,
            reshuffle,
            step,
            settings: LiveSettings::sanitize(settings),
            running: transport.running,
            auto_advance: transport.auto_advance,
        }
    }

    fn check_color(&mut self, color: &str) {
        if parse_hex_rgb(color).is_some() {
            self.warned_color = None;
            return;
        }
        if self.warned_color.as_deref() != Some(color) {
            warn!(
                color,
                fallback = %to_hex(FALLBACK_COLOR),
                "overlay color is not #rgb or #rrggbb"
            );
            self.warned_color = Some(color.to_string());
        }
    }
}
