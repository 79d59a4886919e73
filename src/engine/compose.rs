use crate::config::{Direction, FitMode, TransitionKind};
use crate::engine::modulate::KEN_BURNS_ZOOM;
use crate::engine::motion::slide_axis;
use crate::events::Phase;
use crate::processing::layout::{fit_scale, pan_limits, wrap_offset};
use crate::render::surface::{Placement, Surface, Texture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Current,
    Upcoming,
}

/// One asset draw within a frame, in paint order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlan {
    pub layer: Layer,
    pub opacity: f32,
    /// Extra displacement in surface pixels on top of the wrapped pan offset.
    pub shift: (f64, f64),
    /// Multiplier on top of the modulated zoom.
    pub zoom_boost: f64,
}

impl LayerPlan {
    fn new(layer: Layer, opacity: f32) -> Self {
        Self {
            layer,
            opacity,
            shift: (0.0, 0.0),
            zoom_boost: 1.0,
        }
    }
}

/// Decides which assets to draw, with what opacity and displacement.
pub fn plan_layers(
    kind: TransitionKind,
    phase: Phase,
    blend: f32,
    viewport: (u32, u32),
    direction: Direction,
    cycle_progress: f64,
) -> Vec<LayerPlan> {
    let blend = blend.clamp(0.0, 1.0);
    match (kind, phase) {
        (TransitionKind::Crossfade | TransitionKind::Slide, Phase::Hold) => {
            vec![LayerPlan::new(Layer::Current, 1.0)]
        }
        (TransitionKind::Crossfade, Phase::Transitioning) => vec![
            LayerPlan::new(Layer::Current, 1.0 - blend),
            LayerPlan::new(Layer::Upcoming, blend),
        ],
        (TransitionKind::Slide, Phase::Transitioning) => {
            let travel = f64::from(viewport.0.max(viewport.1));
            let (ax, ay) = slide_axis(direction);
            let out = -travel * f64::from(blend);
            let inn = travel * (1.0 - f64::from(blend));
            vec![
                LayerPlan {
                    shift: (out * ax, out * ay),
                    ..LayerPlan::new(Layer::Current, 1.0)
                },
                LayerPlan {
                    shift: (inn * ax, inn * ay),
                    ..LayerPlan::new(Layer::Upcoming, 1.0)
                },
            ]
        }
        (TransitionKind::KenBurns, _) => {
            let current = LayerPlan {
                zoom_boost: 1.0 + KEN_BURNS_ZOOM * cycle_progress.clamp(0.0, 1.0),
                ..LayerPlan::new(Layer::Current, 1.0)
            };
            if phase == Phase::Hold {
                vec![current]
            } else {
                vec![
                    LayerPlan {
                        opacity: 1.0 - blend,
                        ..current
                    },
                    LayerPlan::new(Layer::Upcoming, blend),
                ]
            }
        }
    }
}

/// Position of an asset on the viewport for the given fit, zoom and pan.
///
/// The pan is wrapped into the legal travel range of this asset at this zoom,
/// so an asset that covers the viewport keeps covering it.
pub fn placement_for(
    asset: (u32, u32),
    viewport: (u32, u32),
    fit: FitMode,
    zoom: f64,
    pan: (f64, f64),
    shift: (f64, f64),
) -> Placement {
    let scale = fit_scale(fit, asset.0, asset.1, viewport.0, viewport.1) * zoom.max(1.0);
    let scaled_w = f64::from(asset.0) * scale;
    let scaled_h = f64::from(asset.1) * scale;
    let (max_x, max_y) = pan_limits(scaled_w, scaled_h, viewport.0, viewport.1);
    Placement {
        center_x: f64::from(viewport.0) / 2.0 + wrap_offset(pan.0, max_x) + shift.0,
        center_y: f64::from(viewport.1) / 2.0 + wrap_offset(pan.1, max_y) + shift.1,
        scale,
    }
}

/// Everything needed to paint one frame.
pub struct FrameInputs<'a> {
    pub current: Option<&'a Texture>,
    pub upcoming: Option<&'a Texture>,
    pub layers: &'a [LayerPlan],
    pub fit: FitMode,
    pub zoom: f64,
    pub pan: (f64, f64),
    pub background: [u8; 3],
    pub overlay_color: [u8; 3],
    pub overlay_alpha: f32,
}

pub fn compose(surface: &mut Surface, frame: &FrameInputs<'_>) {
    let viewport = (surface.width(), surface.height());
    let mut canvas = surface.begin(frame.background);
    for plan in frame.layers {
        let asset = match plan.layer {
            Layer::Current => frame.current,
            Layer::Upcoming => frame.upcoming,
        };
        let Some(asset) = asset else {
            continue;
        };
        let placement = placement_for(
            asset.dimensions(),
            viewport,
            frame.fit,
            frame.zoom * plan.zoom_boost,
            frame.pan,
            plan.shift,
        );
        canvas.draw(asset, placement, plan.opacity);
    }
    canvas.tint(frame.overlay_color, frame.overlay_alpha);
    canvas.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn crossfade_splits_opacity() {
        let plans = plan_layers(
            TransitionKind::Crossfade,
            Phase::Transitioning,
            0.25,
            (100, 50),
            Direction::Static,
            0.0,
        );
        assert_eq!(plans.len(), 2);
        assert_eq!((plans[0].layer, plans[0].opacity), (Layer::Current, 0.75));
        assert_eq!((plans[1].layer, plans[1].opacity), (Layer::Upcoming, 0.25));
        assert_eq!(plans[1].shift, (0.0, 0.0));
    }

    #[test]
    fn slide_travels_the_longest_side() {
        let plans = plan_layers(
            TransitionKind::Slide,
            Phase::Transitioning,
            0.5,
            (100, 50),
            Direction::Orbit,
            0.0,
        );
        assert_eq!(plans[0].shift, (-50.0, 0.0));
        assert_eq!(plans[1].shift, (50.0, 0.0));
        assert!(plans.iter().all(|p| p.opacity == 1.0));

        let down = plan_layers(
            TransitionKind::Slide,
            Phase::Transitioning,
            1.0,
            (100, 50),
            Direction::Down,
            0.0,
        );
        assert_eq!(down[0].shift, (0.0, 100.0));
        assert_eq!(down[1].shift, (0.0, 0.0));
    }

    #[test]
    fn hold_draws_only_current() {
        for kind in [
            TransitionKind::Crossfade,
            TransitionKind::Slide,
            TransitionKind::KenBurns,
        ] {
            let plans = plan_layers(kind, Phase::Hold, 0.0, (10, 10), Direction::Left, 0.5);
            assert_eq!(plans.len(), 1);
            assert_eq!(plans[0].layer, Layer::Current);
        }
    }

    #[test]
    fn ken_burns_zooms_current_only() {
        let plans = plan_layers(
            TransitionKind::KenBurns,
            Phase::Transitioning,
            0.5,
            (10, 10),
            Direction::Static,
            1.0,
        );
        assert!((plans[0].zoom_boost - (1.0 + KEN_BURNS_ZOOM)).abs() < 1e-12);
        assert_eq!(plans[1].zoom_boost, 1.0);
        assert_eq!((plans[0].opacity, plans[1].opacity), (0.5, 0.5));
    }

    #[test]
    fn cover_placement_wraps_pan() {
        // 200x100 asset on 100x100 viewport: cover scale 1, 50px travel each side
        let p = placement_for((200, 100), (100, 100), FitMode::Cover, 1.0, (60.0, 7.0), (0.0, 0.0));
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.center_x, 50.0 - 40.0);
        assert_eq!(p.center_y, 50.0);
    }

    #[test]
    fn contain_placement_centers() {
        let p = placement_for((200, 100), (100, 100), FitMode::Contain, 1.0, (60.0, 7.0), (3.0, 0.0));
        assert_eq!(p.scale, 0.5);
        assert_eq!((p.center_x, p.center_y), (53.0, 50.0));
    }

    #[test]
    fn compose_without_assets_shows_background() {
        let mut surface = Surface::new(4, 4);
        let plans = [LayerPlan::new(Layer::Current, 1.0)];
        let frame = FrameInputs {
            current: None,
            upcoming: None,
            layers: &plans,
            fit: FitMode::Cover,
            zoom: 1.0,
            pan: (0.0, 0.0),
            background: [10, 20, 30],
            overlay_color: [0, 0, 0],
            overlay_alpha: 0.0,
        };
        compose(&mut surface, &frame);
        assert!(surface.image().pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn compose_covers_viewport_and_applies_overlay() {
        let asset =
            Texture::from_rgba(&RgbaImage::from_pixel(30, 10, Rgba([200, 0, 0, 255]))).unwrap();
        let mut surface = Surface::new(10, 10);
        let plans = [LayerPlan::new(Layer::Current, 1.0)];
        let frame = FrameInputs {
            current: Some(&asset),
            upcoming: None,
            layers: &plans,
            fit: FitMode::Cover,
            zoom: 1.0,
            pan: (1234.5, -77.0),
            background: [0, 0, 255],
            overlay_color: [0, 0, 0],
            overlay_alpha: 0.5,
        };
        compose(&mut surface, &frame);
        assert!(surface.image().pixels().all(|p| {
            let [r, g, b, a] = p.0;
            r.abs_diff(100) <= 2 && g == 0 && b == 0 && a == 255
        }));
    }
}
