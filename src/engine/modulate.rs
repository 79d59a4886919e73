use crate::config::Modulation;

/// Relative zoom swing of the pulse mode.
pub const ZOOM_PULSE_AMPLITUDE: f64 = 0.1;

/// Extra zoom a Ken Burns cycle reaches by the end of its transition.
pub const KEN_BURNS_ZOOM: f64 = 0.08;

/// Zoom multiplier at modulation time `t`, never below the native fit.
pub fn zoom_at(base: f64, mode: Modulation, pulse_rate: f64, t: f64) -> f64 {
    let zoom = match mode {
        Modulation::Constant => base,
        Modulation::Pulse => base * (1.0 + ZOOM_PULSE_AMPLITUDE * (t * pulse_rate).sin()),
    };
    zoom.max(1.0)
}

/// Overlay alpha at modulation time `t`, clamped to `[0, 1]`.
pub fn overlay_alpha_at(opacity: f32, mode: Modulation, pulse_rate: f64, t: f64) -> f32 {
    let alpha = match mode {
        Modulation::Constant => opacity,
        Modulation::Pulse => opacity * (0.5 + 0.5 * (t * pulse_rate).sin() as f32),
    };
    alpha.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn constant_modes_ignore_time() {
        assert_eq!(zoom_at(1.5, Modulation::Constant, 3.0, 123.0), 1.5);
        assert_eq!(overlay_alpha_at(0.4, Modulation::Constant, 3.0, 9.0), 0.4);
    }

    #[test]
    fn pulse_zoom_is_floored_at_one() {
        // sin = -1 drops base 1.0 to 0.9, which must be floored
        assert_eq!(zoom_at(1.0, Modulation::Pulse, 1.0, -FRAC_PI_2), 1.0);
        assert!((zoom_at(2.0, Modulation::Pulse, 1.0, FRAC_PI_2) - 2.2).abs() < 1e-12);
    }

    #[test]
    fn pulse_overlay_swings_between_zero_and_opacity() {
        assert!((overlay_alpha_at(0.8, Modulation::Pulse, 2.0, FRAC_PI_2 / 2.0) - 0.8).abs() < 1e-6);
        assert!(overlay_alpha_at(0.8, Modulation::Pulse, 1.0, -FRAC_PI_2).abs() < 1e-6);
        assert_eq!(overlay_alpha_at(3.0, Modulation::Constant, 0.0, 0.0), 1.0);
    }
}
