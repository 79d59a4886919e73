//! Slideshow engine: owns the loader, playback order, phase clock and pan state,
//! and is driven by the host through `sync`, `tick` and `render`.

pub mod bridge;
pub mod compose;
pub mod modulate;
pub mod motion;
pub mod order;
pub mod transition;

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::{EngineOptions, SceneSettings};
use crate::events::{EngineStatus, Phase, StepDirection, Transport};
use crate::render::loader::{AssetLoader, Decoder, FileDecoder};
use crate::render::surface::Surface;

use self::bridge::{LiveSettings, SyncBridge};
use self::compose::{FrameInputs, compose, plan_layers};
use self::modulate::{overlay_alpha_at, zoom_at};
use self::motion::PanState;
use self::order::PlaybackOrder;
use self::transition::{PhaseEvent, TransitionClock};

pub struct Engine {
    loader: AssetLoader,
    order: PlaybackOrder,
    clock: TransitionClock,
    pan: PanState,
    bridge: SyncBridge,
    live: LiveSettings,
    rng: StdRng,
    background: [u8; 3],
    max_dt: f64,
    viewport: (u32, u32),
    /// Motion time in seconds; stands still while paused.
    time: f64,
    /// Clock for zoom and overlay pulses; keeps running while paused.
    modulation_time: f64,
    running: bool,
    auto_advance: bool,
    /// The order no longer matches the loaded slots and is rebuilt once the load settles.
    order_stale: bool,
    /// A reload is in flight and its completion has not been reported yet.
    loading: bool,
}

impl Engine {
    pub fn new(options: &EngineOptions, decoder: Arc<dyn Decoder>, width: u32, height: u32) -> Self {
        let rng = match options.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            loader: AssetLoader::spawn(decoder, options.decode_workers),
            order: PlaybackOrder::new(),
            clock: TransitionClock::new(),
            pan: PanState::default(),
            bridge: SyncBridge::new(),
            live: LiveSettings::default(),
            rng,
            background: options.background_rgb(),
            max_dt: options.max_frame_delta.as_secs_f64(),
            viewport: (width.max(1), height.max(1)),
            time: 0.0,
            modulation_time: 0.0,
            running: true,
            auto_advance: true,
            order_stale: false,
            loading: false,
        }
    }

    /// Engine decoding local files with the options' size limit.
    pub fn with_file_decoder(options: &EngineOptions, width: u32, height: u32) -> Self {
        let decoder = Arc::new(FileDecoder::new(options.asset_max_dim));
        Self::new(options, decoder, width, height)
    }

    /// Applies a configuration delivery. Only what changed since the previous
    /// delivery has side effects; an identical delivery leaves phase, order and pan alone.
    pub fn sync(&mut self, settings: &SceneSettings, transport: &Transport) {
        let plan = self.bridge.plan(settings, transport);
        self.live = plan.settings;

        if plan.reload {
            self.reload(&settings.assets);
        } else if plan.reshuffle {
            debug!(shuffle = self.live.shuffle, "playback order rebuild requested");
            if self.loader.is_settled() && !self.loading {
                self.rebuild_order();
            } else {
                self.order_stale = true;
            }
        }

        if let Some(direction) = plan.step {
            self.manual_step(direction);
        }

        if self.running != plan.running {
            debug!(running = plan.running, "transport running changed");
        }
        self.running = plan.running;
        self.auto_advance = plan.auto_advance;
    }

    /// Advances the engine by one frame of `dt`, clamped to the configured maximum.
    pub fn tick(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64().min(self.max_dt);
        self.modulation_time += dt;

        self.loader.poll();
        if self.loader.is_settled() {
            if self.loading {
                self.loading = false;
                info!(
                    generation = self.loader.generation(),
                    loaded = self.loader.loaded_count(),
                    failed = self.loader.failed_count(),
                    "asset load settled"
                );
            }
            if self.order_stale {
                self.rebuild_order();
            }
        }

        if !self.running {
            return;
        }
        self.time += dt;
        if self.order.is_empty() {
            return;
        }

        self.pan
            .integrate(dt, self.live.direction, self.live.pan_speed, self.time);
        let can_advance = self.auto_advance && self.order.len() > 1;
        match self.clock.on_tick(dt, self.live.timing(), can_advance) {
            Some(PhaseEvent::Began) => debug!(
                from = ?self.order.current_slot(),
                to = ?self.order.upcoming_slot(),
                kind = %self.live.transition,
                "transition started"
            ),
            Some(PhaseEvent::Completed) => {
                self.order.advance();
                self.pan.reset();
                debug!(current = ?self.order.current_slot(), "transition completed");
            }
            None => {}
        }
    }

    /// Paints the current frame. Pausing never affects drawing.
    ///
    /// Zoom and overlay pulses follow the modulation clock, which advances
    /// with every tick whether or not the transport is running.
    pub fn render(&self, surface: &mut Surface) {
        surface.resize(self.viewport.0, self.viewport.1);
        if !self.is_ready() {
            surface.clear(self.background);
            return;
        }
        let timing = self.live.timing();
        let layers = plan_layers(
            self.live.transition,
            self.clock.phase(),
            self.clock.blend(timing),
            self.viewport,
            self.live.direction,
            self.clock.cycle_progress(timing),
        );
        let current = self.order.current_slot().and_then(|i| self.loader.asset(i));
        let upcoming = self.order.upcoming_slot().and_then(|i| self.loader.asset(i));
        let frame = FrameInputs {
            current: current.map(|a| &**a),
            upcoming: upcoming.map(|a| &**a),
            layers: &layers,
            fit: self.live.fit,
            zoom: zoom_at(
                self.live.zoom_base,
                self.live.zoom_mode,
                self.live.zoom_rate,
                self.modulation_time,
            ),
            pan: self.pan.position(),
            background: self.background,
            overlay_color: self.live.overlay_color,
            overlay_alpha: overlay_alpha_at(
                self.live.overlay_opacity,
                self.live.overlay_mode,
                self.live.overlay_rate,
                self.modulation_time,
            ),
        };
        compose(surface, &frame);
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            ready: self.is_ready(),
            generation: self.loader.generation(),
            slots: self.loader.len(),
            loaded: self.loader.loaded_count(),
            failed: self.loader.failed_count(),
            pending: self.loader.pending_count(),
            phase: self.clock.phase(),
            blend: self.blend(),
            current_slot: self.order.current_slot(),
            upcoming_slot: self.order.upcoming_slot(),
            running: self.running,
            auto_advance: self.auto_advance,
        }
    }

    /// Every slot resolved, at least one decoded, and an order built over them.
    pub fn is_ready(&self) -> bool {
        self.loader.is_ready() && !self.order.is_empty()
    }

    pub fn phase(&self) -> Phase {
        self.clock.phase()
    }

    pub fn blend(&self) -> f32 {
        self.clock.blend(self.live.timing())
    }

    pub fn current_slot(&self) -> Option<usize> {
        self.order.current_slot()
    }

    pub fn upcoming_slot(&self) -> Option<usize> {
        self.order.upcoming_slot()
    }

    /// Unwrapped pan position in pixels.
    pub fn pan_position(&self) -> (f64, f64) {
        self.pan.position()
    }

    pub fn generation(&self) -> u64 {
        self.loader.generation()
    }

    pub fn order(&self) -> &PlaybackOrder {
        &self.order
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    /// Blocks until the current load settles; for hosts that preload before the first frame.
    pub fn wait_settled(&mut self, timeout: Duration) -> bool {
        self.loader.wait_settled(timeout)
    }

    pub fn live_settings(&self) -> &LiveSettings {
        &self.live
    }

    fn reload(&mut self, assets: &[String]) {
        let generation = self.loader.load(assets);
        debug!(generation, count = assets.len(), "reloading assets");
        self.order.clear();
        self.clock.reset();
        self.pan.reset();
        self.order_stale = true;
        self.loading = true;
    }

    fn rebuild_order(&mut self) {
        let valid = self.loader.loaded_slots();
        if valid.is_empty() && !self.loader.is_empty() {
            warn!(
                generation = self.loader.generation(),
                failed = self.loader.failed_count(),
                "no asset could be loaded; drawing background only"
            );
        }
        self.order.rebuild(valid, self.live.shuffle, &mut self.rng);
        self.clock.reset();
        self.pan.reset();
        self.order_stale = false;
        debug!(
            len = self.order.len(),
            shuffle = self.live.shuffle,
            "playback order rebuilt"
        );
    }

    fn manual_step(&mut self, direction: StepDirection) {
        self.order.step(direction);
        self.clock.reset();
        self.pan.reset();
        debug!(?direction, current = ?self.order.current_slot(), "manual step");
    }
}
